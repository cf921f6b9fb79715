//! Dependency graph of task nodes.
//!
//! A [`Crew`] owns its agents and the precedence edges between them. Edges
//! are checked on insertion, so the graph is acyclic by construction.
//! [`Crew::kickoff`] runs the agents in topological order and hands each
//! finished agent's output to its dependents.

use std::collections::BTreeSet;

use futures::future::join_all;
use uuid::Uuid;

use crate::agent::core::{Agent, ContextEntry, NodeId};
use crate::crews::crew_output::CrewOutput;
use crate::process::Process;
use crate::tasks::task_output::TaskOutput;
use crate::utilities::config::CrewConfig;
use crate::utilities::errors::{CrewError, GraphError};

/// A group of agents and the order they must run in.
#[derive(Debug)]
pub struct Crew {
    pub id: Uuid,
    pub name: String,
    pub config: CrewConfig,
    agents: Vec<Agent>,
}

impl Default for Crew {
    fn default() -> Self {
        Self::new("crew")
    }
}

impl Crew {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            config: CrewConfig::default(),
            agents: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: CrewConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an agent. Ids are assigned in registration order.
    pub fn add_agent(&mut self, mut agent: Agent) -> NodeId {
        agent.dependencies.clear();
        agent.dependents.clear();
        let id = self.agents.len();
        log::debug!("Crew '{}' registered agent '{}' as node {}", self.name, agent.name, id);
        self.agents.push(agent);
        id
    }

    pub fn agent(&self, id: NodeId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Id of the first agent called `name`.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.agents.iter().position(|a| a.name == name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    fn check(&self, id: NodeId) -> Result<(), GraphError> {
        if id < self.agents.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    pub fn dependencies(&self, id: NodeId) -> Result<&[NodeId], GraphError> {
        self.check(id)?;
        Ok(self.agents[id].dependencies())
    }

    pub fn dependents(&self, id: NodeId) -> Result<&[NodeId], GraphError> {
        self.check(id)?;
        Ok(self.agents[id].dependents())
    }

    /// Whether `to` is reachable from `from` along dependent edges.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut visited = vec![false; self.agents.len()];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if std::mem::replace(&mut visited[node], true) {
                continue;
            }
            stack.extend(self.agents[node].dependents.iter().copied());
        }
        false
    }

    fn cycle(&self, from: NodeId, to: NodeId) -> GraphError {
        GraphError::Cycle {
            from: self.agents[from].name.clone(),
            to: self.agents[to].name.clone(),
        }
    }

    /// `first` must finish before `then` starts.
    ///
    /// Adding an existing edge is a no-op. Self-edges and edges that would
    /// close a cycle fail and leave the graph unchanged.
    pub fn precede(&mut self, first: NodeId, then: NodeId) -> Result<(), GraphError> {
        self.check(first)?;
        self.check(then)?;
        if self.agents[first].dependents.contains(&then) {
            return Ok(());
        }
        if first == then || self.reaches(then, first) {
            return Err(self.cycle(first, then));
        }
        self.agents[first].dependents.push(then);
        self.agents[then].dependencies.push(first);
        Ok(())
    }

    /// `node` waits for `dependency`.
    pub fn depends_on(&mut self, node: NodeId, dependency: NodeId) -> Result<(), GraphError> {
        self.precede(dependency, node)
    }

    /// Every node of `first` precedes every node of `then`. All or nothing:
    /// on failure the edges added by this call are removed again.
    pub fn precede_all(&mut self, first: &[NodeId], then: &[NodeId]) -> Result<(), GraphError> {
        let mut added = Vec::new();
        for &a in first {
            for &b in then {
                let existed = a < self.agents.len() && self.agents[a].dependents.contains(&b);
                match self.precede(a, b) {
                    Ok(()) if !existed => added.push((a, b)),
                    Ok(()) => {}
                    Err(err) => {
                        for (a, b) in added {
                            self.remove_edge(a, b);
                        }
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }

    fn remove_edge(&mut self, first: NodeId, then: NodeId) {
        self.agents[first].dependents.retain(|&n| n != then);
        self.agents[then].dependencies.retain(|&n| n != first);
    }

    /// Kahn's algorithm; among ready nodes the earliest registered goes
    /// first.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut in_degree: Vec<usize> = self.agents.iter().map(|a| a.dependencies.len()).collect();
        let mut ready: BTreeSet<NodeId> = (0..self.agents.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.agents.len());

        while let Some(node) = ready.pop_first() {
            order.push(node);
            for &dependent in &self.agents[node].dependents {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }
        order
    }

    /// Groups of nodes whose dependencies all lie in earlier groups. Each
    /// group is in registration order.
    pub fn execution_waves(&self) -> Vec<Vec<NodeId>> {
        let mut in_degree: Vec<usize> = self.agents.iter().map(|a| a.dependencies.len()).collect();
        let mut wave: Vec<NodeId> = (0..self.agents.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut waves = Vec::new();

        while !wave.is_empty() {
            let mut next = BTreeSet::new();
            for &node in &wave {
                for &dependent in &self.agents[node].dependents {
                    in_degree[dependent] -= 1;
                    if in_degree[dependent] == 0 {
                        next.insert(dependent);
                    }
                }
            }
            waves.push(wave);
            wave = next.into_iter().collect();
        }
        waves
    }

    /// Hand `producer`'s output to each of its dependents.
    ///
    /// With transitive propagation the producer's own inbound context goes
    /// first, skipping entries from nodes the dependent already heard from.
    /// Nodes are told apart by id, so agents may share a name.
    fn deliver(&mut self, producer: NodeId) {
        let source = &self.agents[producer];
        let output = match source.output() {
            Some(output) => output.raw.clone(),
            None => return,
        };
        let name = source.name.clone();
        let inherited: Vec<ContextEntry> = if self.config.propagate_transitive {
            source.context().to_vec()
        } else {
            Vec::new()
        };
        let dependents = source.dependents.clone();

        for dependent in dependents {
            let target = &mut self.agents[dependent];
            for entry in &inherited {
                if !target.has_entry(entry) {
                    target.receive_entry(entry.clone());
                }
            }
            target.receive_entry(ContextEntry::from_node(producer, name.clone(), output.clone()));
        }
    }

    async fn run_node(&mut self, id: NodeId) -> Result<TaskOutput, CrewError> {
        let defaults = self.config.actor.clone();
        let agent = &mut self.agents[id];
        agent
            .execute(&defaults)
            .await
            .map_err(|source| CrewError::Agent {
                agent: agent.name.clone(),
                source,
            })
    }

    async fn run_wave(&mut self, wave: &[NodeId]) -> Result<Vec<TaskOutput>, CrewError> {
        let defaults = self.config.actor.clone();
        let runs = self
            .agents
            .iter_mut()
            .enumerate()
            .filter(|(id, _)| wave.contains(id))
            .map(|(_, agent)| {
                let defaults = &defaults;
                async move {
                    let result = agent.execute(defaults).await;
                    (agent.name.clone(), result)
                }
            });

        let mut outputs = Vec::with_capacity(wave.len());
        for (name, result) in join_all(runs).await {
            outputs.push(result.map_err(|source| CrewError::Agent { agent: name, source })?);
        }
        Ok(outputs)
    }

    /// Run every agent once.
    ///
    /// Per-run state (context buffers and outputs) is cleared first. The
    /// first agent failure stops the run; in parallel mode the rest of its
    /// wave still completes.
    pub async fn kickoff(&mut self) -> Result<CrewOutput, CrewError> {
        if self.agents.is_empty() {
            return Err(CrewError::Empty);
        }
        for agent in &mut self.agents {
            agent.reset();
        }

        log::info!(
            "Crew '{}' kickoff: {} agents, {} process",
            self.name,
            self.agents.len(),
            self.config.process
        );

        let mut tasks_output = Vec::with_capacity(self.agents.len());
        match self.config.process {
            Process::Sequential => {
                for id in self.topological_order() {
                    let output = self.run_node(id).await?;
                    self.deliver(id);
                    tasks_output.push(output);
                }
            }
            Process::Parallel => {
                for wave in self.execution_waves() {
                    log::debug!("Crew '{}' running wave {:?}", self.name, wave);
                    let outputs = self.run_wave(&wave).await?;
                    for &id in &wave {
                        self.deliver(id);
                    }
                    tasks_output.extend(outputs);
                }
            }
        }

        log::info!("Crew '{}' finished", self.name);
        Ok(CrewOutput::new(tasks_output))
    }
}
