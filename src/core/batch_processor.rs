//! Batch processing with account-based partitioning for concurrent replay
//!
//! This module provides the `BatchProcessor` struct, which replays a batch of
//! ledger commands concurrently while producing the same final state as a
//! sequential replay of the same file.
//!
//! # Design
//!
//! A batch is split into runs at every `OpenAccount` command, which is applied
//! inline so labels exist before any later movement needs them. Within a run of
//! movements, commands are partitioned into groups of connected accounts: two
//! commands land in the same group whenever they share an account, directly or
//! through other commands. Groups touch disjoint accounts, so they run as
//! independent tasks, while each group keeps file order.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── Arc<ReplayEngine>  (label resolution over the shared ledger)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::replay::ReplayEngine;
use crate::types::{LedgerCommand, LedgerError};
use tokio::task::JoinError;

/// Result of processing a single command
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The command that was processed
    pub command: LedgerCommand,

    /// The result of processing (success or error)
    pub result: Result<(), LedgerError>,
}

#[derive(Clone)]
pub struct BatchProcessor {
    replay: Arc<ReplayEngine>,
}

impl BatchProcessor {
    pub fn new(replay: Arc<ReplayEngine>) -> Self {
        Self { replay }
    }

    /// Partition movement commands into groups of connected account labels
    ///
    /// Groups are returned in order of their first command, and every group
    /// preserves the relative order of its commands.
    pub fn partition_by_accounts(&self, commands: Vec<LedgerCommand>) -> Vec<Vec<LedgerCommand>> {
        let mut groups = LabelGroups::default();
        let roots: Vec<usize> = commands
            .iter()
            .map(|command| groups.union_all(&command.labels()))
            .collect();

        // Roots can move while later commands merge groups; resolve them at the end
        let mut partitions: Vec<Vec<LedgerCommand>> = Vec::new();
        let mut slot_by_root: HashMap<usize, usize> = HashMap::new();
        for (command, root) in commands.into_iter().zip(roots) {
            let root = groups.find(root);
            let slot = *slot_by_root.entry(root).or_insert_with(|| {
                partitions.push(Vec::new());
                partitions.len() - 1
            });
            partitions[slot].push(command);
        }

        partitions
    }

    /// Apply a group's commands in order
    pub fn process_group(&self, commands: Vec<LedgerCommand>) -> Vec<ProcessingResult> {
        commands
            .into_iter()
            .map(|command| self.process_command(command))
            .collect()
    }

    /// Process a batch of commands
    ///
    /// Account openings apply in place; each run of movements between them is
    /// partitioned and its groups run on the blocking pool concurrently.
    pub async fn process_batch(&self, batch: Vec<LedgerCommand>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(batch.len());
        let mut run = Vec::new();

        for command in batch {
            if command.is_movement() {
                run.push(command);
                continue;
            }
            if !run.is_empty() {
                results.extend(self.process_run(std::mem::take(&mut run)).await);
            }
            results.push(self.process_command(command));
        }
        if !run.is_empty() {
            results.extend(self.process_run(run).await);
        }

        results
    }

    async fn process_run(&self, run: Vec<LedgerCommand>) -> Vec<ProcessingResult> {
        let mut tasks = Vec::new();
        for group in self.partition_by_accounts(run) {
            let processor = self.clone();
            let commands = group.clone();
            let task = tokio::task::spawn_blocking(move || processor.process_group(group));
            tasks.push((commands, task));
        }

        let mut results = Vec::new();
        for (commands, task) in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(e) => results.extend(failed_group(commands, &e)),
            }
        }
        results
    }

    fn process_command(&self, command: LedgerCommand) -> ProcessingResult {
        let result = self.replay.process(command.clone());
        if let Err(e) = &result {
            tracing::warn!(command = ?command, error = %e, "Command rejected");
        }
        ProcessingResult { command, result }
    }
}

/// One `BackendUnavailable` result per command of a group whose task died
///
/// Commands the group applied before the failure stay applied.
fn failed_group(commands: Vec<LedgerCommand>, error: &JoinError) -> Vec<ProcessingResult> {
    tracing::error!(error = %error, commands = commands.len(), "Replay task failed");
    commands
        .into_iter()
        .map(|command| ProcessingResult {
            command,
            result: Err(LedgerError::backend_unavailable(format!(
                "replay task failed: {}",
                error
            ))),
        })
        .collect()
}

/// Union-find over account labels
#[derive(Default)]
struct LabelGroups {
    index: HashMap<String, usize>,
    parent: Vec<usize>,
}

impl LabelGroups {
    fn node(&mut self, label: &str) -> usize {
        if let Some(&node) = self.index.get(label) {
            return node;
        }
        let node = self.parent.len();
        self.parent.push(node);
        self.index.insert(label.to_string(), node);
        node
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    /// Merge every label into one group and return its root
    fn union_all(&mut self, labels: &[&str]) -> usize {
        let nodes: Vec<usize> = labels.iter().map(|label| self.node(label)).collect();
        let Some((&first, rest)) = nodes.split_first() else {
            // Label-less input gets a group of its own
            let node = self.parent.len();
            self.parent.push(node);
            return node;
        };

        let root = self.find(first);
        for &node in rest {
            let other = self.find(node);
            if other != root {
                self.parent[other] = root;
            }
        }
        root
    }
}
