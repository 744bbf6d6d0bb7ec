//! Hand-off router
//!
//! Wraps several agents behind names and moves one task through them. A
//! routing agent halts with a `{"handoff_to": "<agent>"}` decision; the
//! router then starts a new machine for the target, seeded with the whole
//! accumulated log. Agents without hand-off targets produce the final
//! artifact.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use super::runtime::AgentRuntime;
use crate::agent::{AgentOutput, AgentSpec, RoutingDecision};
use crate::error::{BizScoutError, Result};
use crate::events::RunEvent;
use crate::llm::Message;

/// One hand-off taken during a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    pub from: String,
    pub to: String,
    pub decision: RoutingDecision,
}

/// Result of a completed pipeline
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Agent that produced the artifact
    pub final_agent: String,
    pub artifact: AgentOutput,
    /// Log accumulated across every stage
    pub log: Vec<Message>,
    pub hops: Vec<Hop>,
}

/// Routes a task through named agents
#[derive(Debug, Clone)]
pub struct HandoffRouter {
    runtime: AgentRuntime,
    agents: HashMap<String, Arc<AgentSpec>>,
}

impl HandoffRouter {
    pub fn builder(runtime: AgentRuntime) -> HandoffRouterBuilder {
        HandoffRouterBuilder::new(runtime)
    }

    pub fn runtime(&self) -> &AgentRuntime {
        &self.runtime
    }

    /// Agent as the router runs it (routing agents carry the generated hand-off section)
    pub fn agent(&self, name: &str) -> Option<&Arc<AgentSpec>> {
        self.agents.get(name)
    }

    /// Registered agent names, sorted
    pub fn agent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a routing agent's decision to the next agent.
    ///
    /// Deterministic: the same decision from the same agent always picks the
    /// same target.
    pub fn resolve_target(
        &self,
        from: &AgentSpec,
        decision: &RoutingDecision,
    ) -> Result<Arc<AgentSpec>> {
        let unknown = || BizScoutError::UnknownHandoffTarget {
            agent: from.name().to_string(),
            target: decision.handoff_to.clone(),
        };

        if !from.can_hand_off_to(&decision.handoff_to) {
            return Err(unknown());
        }
        self.agents.get(&decision.handoff_to).cloned().ok_or_else(unknown)
    }

    /// Run a task from `entry_agent` until an agent produces the artifact
    #[instrument(skip(self, input), fields(entry = %entry_agent))]
    pub async fn run_pipeline(
        &self,
        entry_agent: &str,
        input: Vec<Message>,
    ) -> Result<PipelineOutcome> {
        let mut current = self.agents.get(entry_agent).cloned().ok_or_else(|| {
            BizScoutError::Configuration(format!("Unknown entry agent '{}'", entry_agent))
        })?;
        let mut log = input;
        let mut hops = Vec::new();

        loop {
            let outcome = self.runtime.run(current.clone(), log).await?;
            log = outcome.log;

            let decision = if current.is_router() {
                outcome.output.routing_decision()
            } else {
                None
            };

            let Some(decision) = decision else {
                info!(agent = %current.name(), hops = hops.len(), "Pipeline finished");
                return Ok(PipelineOutcome {
                    final_agent: current.name().to_string(),
                    artifact: outcome.output,
                    log,
                    hops,
                });
            };

            let next = self.resolve_target(&current, &decision)?;
            info!(from = %current.name(), to = %next.name(), "Handing off");

            if let Some(events) = self.runtime.events() {
                let _ = events
                    .send(RunEvent::Handoff {
                        from: current.name().to_string(),
                        to: next.name().to_string(),
                        timestamp: Utc::now(),
                    })
                    .await;
            }

            hops.push(Hop {
                from: current.name().to_string(),
                to: next.name().to_string(),
                decision,
            });
            current = next;
        }
    }
}

/// Builder for [`HandoffRouter`]
#[derive(Debug)]
pub struct HandoffRouterBuilder {
    runtime: AgentRuntime,
    agents: Vec<AgentSpec>,
}

impl HandoffRouterBuilder {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self {
            runtime,
            agents: Vec::new(),
        }
    }

    pub fn agent(mut self, agent: AgentSpec) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = AgentSpec>) -> Self {
        self.agents.extend(agents);
        self
    }

    /// Validate the hand-off graph and build the router.
    ///
    /// Fails on duplicate agent names, targets that are not registered, and
    /// cycles.
    pub fn build(self) -> Result<HandoffRouter> {
        let mut by_name: HashMap<String, AgentSpec> = HashMap::new();
        for agent in self.agents {
            let name = agent.name().to_string();
            if by_name.insert(name.clone(), agent).is_some() {
                return Err(BizScoutError::Configuration(format!(
                    "Agent '{}' is defined more than once",
                    name
                )));
            }
        }

        for agent in by_name.values() {
            for target in agent.hand_off_targets() {
                if !by_name.contains_key(target) {
                    return Err(BizScoutError::Configuration(format!(
                        "Agent '{}' hands off to unknown agent '{}'",
                        agent.name(),
                        target
                    )));
                }
            }
        }

        check_acyclic(&by_name)?;

        let agents = by_name
            .iter()
            .map(|(name, agent)| {
                let spec = if agent.is_router() {
                    agent.with_appended_instructions(&handoff_section(agent, &by_name))
                } else {
                    agent.clone()
                };
                (name.clone(), Arc::new(spec))
            })
            .collect();

        Ok(HandoffRouter {
            runtime: self.runtime,
            agents,
        })
    }
}

/// Instructions appended to a routing agent
fn handoff_section(agent: &AgentSpec, agents: &HashMap<String, AgentSpec>) -> String {
    let mut section = String::from(
        "## Hand-offs\n\
         When the task should continue with another agent, finish your turn with a JSON \
         object of the form {\"handoff_to\": \"<agent name>\"}, adding any plan fields your \
         instructions ask for. Available agents:",
    );
    for target in agent.hand_off_targets() {
        let description = agents
            .get(target)
            .and_then(|a| a.handoff_description())
            .unwrap_or("No description");
        section.push_str(&format!("\n- {}: {}", target, description));
    }
    section
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

fn check_acyclic(agents: &HashMap<String, AgentSpec>) -> Result<()> {
    fn visit<'a>(
        name: &'a str,
        agents: &'a HashMap<String, AgentSpec>,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                path.push(name);
                return Err(BizScoutError::Configuration(format!(
                    "Hand-off cycle: {}",
                    path.join(" -> ")
                )));
            }
            None => {}
        }

        marks.insert(name, Mark::Visiting);
        path.push(name);
        if let Some(agent) = agents.get(name) {
            for target in agent.hand_off_targets() {
                visit(target, agents, marks, path)?;
            }
        }
        path.pop();
        marks.insert(name, Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut names: Vec<&str> = agents.keys().map(String::as_str).collect();
    names.sort_unstable();
    for name in names {
        visit(name, agents, &mut marks, &mut Vec::new())?;
    }
    Ok(())
}
