//! Scripted probe implementations (for testing).

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use adeprecheck_common::Result;

use crate::command::{CommandOutcome, CommandRunner};
use crate::memory::MemoryReader;
use crate::mounts::{MountEntry, MountTable};

#[derive(Debug, Clone)]
enum Step {
    Exit(i32),
    SpawnFailure(String),
}

/// Command runner replaying queued outcomes in order.
///
/// Once the queue is empty every further call exits with the fallback code
/// (0 unless changed with [`ScriptedRunner::with_fallback`]).
#[derive(Debug)]
pub struct ScriptedRunner {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<String>>,
    fallback: i32,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fallback: 0,
        }
    }

    /// Runner whose commands always exit with `status`.
    pub fn always(status: i32) -> Self {
        Self::new().with_fallback(status)
    }

    /// Runner replaying the given exit codes.
    pub fn exits(statuses: &[i32]) -> Self {
        statuses
            .iter()
            .fold(Self::new(), |runner, status| runner.then_exit(*status))
    }

    pub fn with_fallback(mut self, status: i32) -> Self {
        self.fallback = status;
        self
    }

    /// Queue a command exiting with `status`.
    pub fn then_exit(self, status: i32) -> Self {
        self.push(Step::Exit(status))
    }

    /// Queue a command that cannot be spawned.
    pub fn then_fail(self, reason: impl Into<String>) -> Self {
        self.push(Step::SpawnFailure(reason.into()))
    }

    /// Command lines seen so far, space-joined.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn push(self, step: Step) -> Self {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(step);
        }
        self
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutcome> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line);
        }

        let step = self
            .steps
            .lock()
            .ok()
            .and_then(|mut steps| steps.pop_front())
            .unwrap_or(Step::Exit(self.fallback));

        match step {
            Step::Exit(status) => Ok(CommandOutcome::exit(status)),
            Step::SpawnFailure(reason) => Err(io::Error::new(io::ErrorKind::NotFound, reason).into()),
        }
    }
}

/// Memory reader reporting a fixed value, or failing when `None`.
#[derive(Debug, Clone, Copy)]
pub struct FixedMemory(pub Option<u64>);

impl FixedMemory {
    pub fn kib(value: u64) -> Self {
        Self(Some(value))
    }

    pub fn unreadable() -> Self {
        Self(None)
    }
}

impl MemoryReader for FixedMemory {
    fn total_memory_kib(&self) -> Result<u64> {
        self.0
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "memory unreadable").into())
    }
}

/// Mount table returning fixed entries and counting reads.
#[derive(Debug, Default)]
pub struct FixedMounts {
    entries: Option<Vec<MountEntry>>,
    reads: AtomicUsize,
}

impl FixedMounts {
    pub fn new(entries: Vec<MountEntry>) -> Self {
        Self {
            entries: Some(entries),
            reads: AtomicUsize::new(0),
        }
    }

    /// Mount table whose every read fails.
    pub fn unreadable() -> Self {
        Self::default()
    }

    /// Number of times the table has been read.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl MountTable for FixedMounts {
    fn mounts(&self) -> Result<Vec<MountEntry>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.entries
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "mount table unreadable").into())
    }
}
