//! End-to-end crew runs against scripted engines.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use agentcrew::llms::ScriptedEngine;
use agentcrew::utilities::errors::{CrewError, GraphError};
use agentcrew::{
    ActorConfig, Agent, Capability, CapabilitySet, Crew, CrewConfig, Handler, Process,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scripted(replies: &[&str]) -> Arc<ScriptedEngine> {
    Arc::new(ScriptedEngine::new(replies.iter().copied()))
}

fn last_instruction(engine: &ScriptedEngine) -> String {
    engine
        .transcripts()
        .first()
        .and_then(|t| t.last().map(|m| m.content.clone()))
        .unwrap_or_default()
}

#[tokio::test]
async fn chain_propagates_context_in_order() {
    init_logger();
    let a = scripted(&["alpha facts"]);
    let b = scripted(&["beta summary"]);
    let c = scripted(&["gamma report"]);

    let mut crew = Crew::new("chain");
    let na = crew.add_agent(Agent::new("A", "collect facts", a.clone()));
    let nb = crew.add_agent(Agent::new("B", "summarise", b.clone()));
    let nc = crew.add_agent(Agent::new("C", "report", c.clone()));
    crew.precede(na, nb).unwrap();
    crew.depends_on(nc, nb).unwrap();

    let output = crew.kickoff().await.unwrap();
    assert_eq!(output.execution_order(), vec!["A", "B", "C"]);
    assert_eq!(output.raw, "gamma report");

    let b_prompt = last_instruction(&b);
    assert!(b_prompt.contains("A produced the following output:\nalpha facts"));

    let c_prompt = last_instruction(&c);
    let pos_a = c_prompt.find("A produced the following output").unwrap();
    let pos_b = c_prompt.find("B produced the following output").unwrap();
    assert!(pos_a < pos_b);

    let c_node = crew.agent(nc).unwrap();
    let producers: Vec<&str> = c_node.context().iter().map(|e| e.producer.as_str()).collect();
    assert_eq!(producers, vec!["A", "B"]);
}

#[tokio::test]
async fn direct_context_only_without_transitive_propagation() {
    init_logger();
    let c = scripted(&["done"]);
    let mut crew = Crew::new("direct").with_config(CrewConfig {
        propagate_transitive: false,
        ..CrewConfig::default()
    });
    let na = crew.add_agent(Agent::new("A", "a", scripted(&["from a"])));
    let nb = crew.add_agent(Agent::new("B", "b", scripted(&["from b"])));
    let nc = crew.add_agent(Agent::new("C", "c", c.clone()));
    crew.precede_all(&[na], &[nb]).unwrap();
    crew.precede(nb, nc).unwrap();

    crew.kickoff().await.unwrap();
    let prompt = last_instruction(&c);
    assert!(!prompt.contains("A produced"));
    assert!(prompt.contains("B produced the following output:\nfrom b"));
}

#[tokio::test]
async fn closing_edge_is_rejected_and_run_still_works() {
    init_logger();
    let mut crew = Crew::new("cycle");
    let na = crew.add_agent(Agent::new("A", "a", scripted(&["1"])));
    let nb = crew.add_agent(Agent::new("B", "b", scripted(&["2"])));
    let nc = crew.add_agent(Agent::new("C", "c", scripted(&["3"])));
    crew.precede(na, nb).unwrap();
    crew.precede(nb, nc).unwrap();

    let err = crew.precede(nc, na).unwrap_err();
    assert!(matches!(err, GraphError::Cycle { .. }));
    assert!(crew.dependencies(na).unwrap().is_empty());
    assert!(crew.dependents(nc).unwrap().is_empty());

    let output = crew.kickoff().await.unwrap();
    assert_eq!(output.execution_order(), vec!["A", "B", "C"]);
}

#[tokio::test(start_paused = true)]
async fn parallel_waves_run_concurrently() {
    init_logger();
    let delay = Duration::from_millis(100);
    let a = Arc::new(ScriptedEngine::new(["from a"]).with_delay(delay));
    let b = Arc::new(ScriptedEngine::new(["from b"]).with_delay(delay));
    let c = Arc::new(ScriptedEngine::new(["merged"]).with_delay(delay));

    let config = CrewConfig::from_yaml_str("process: parallel\n").unwrap();
    assert_eq!(config.process, Process::Parallel);
    let mut crew = Crew::new("fan-in").with_config(config);
    let na = crew.add_agent(Agent::new("A", "a", a));
    let nb = crew.add_agent(Agent::new("B", "b", b));
    let nc = crew.add_agent(Agent::new("C", "c", c.clone()));
    crew.precede_all(&[na, nb], &[nc]).unwrap();

    let started = tokio::time::Instant::now();
    let output = crew.kickoff().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_millis(250), "took {:?}", elapsed);
    assert_eq!(output.execution_order(), vec!["A", "B", "C"]);
    let prompt = last_instruction(&c);
    assert!(prompt.find("A produced").unwrap() < prompt.find("B produced").unwrap());
}

#[tokio::test]
async fn tool_using_agent_feeds_dependent() {
    init_logger();
    let square = Capability::builder("square")
        .description("Square a number")
        .param("a", "int")
        .build(Handler::blocking(|args| {
            let a = args["a"].as_i64().unwrap_or_default();
            Ok(json!(a * a))
        }))
        .unwrap();
    let calc = scripted(&[
        "<thought>square it</thought><tool_call>{\"name\": \"square\", \"arguments\": {\"a\": \"5\"}, \"id\": 0}</tool_call>",
        "<response>25</response>",
    ]);
    let writer = scripted(&["The answer is 25."]);

    let mut crew = Crew::new("math");
    let n_calc = crew.add_agent(
        Agent::new("Calculator", "Square five", calc.clone())
            .with_capabilities(CapabilitySet::try_from_iter([square]).unwrap()),
    );
    let n_writer = crew.add_agent(Agent::new("Writer", "Explain the result", writer.clone()));
    crew.precede(n_calc, n_writer).unwrap();

    let output = crew.kickoff().await.unwrap();
    assert_eq!(output.get("Calculator").unwrap().raw, "25");
    assert_eq!(calc.calls(), 2);
    assert!(last_instruction(&writer).contains("Calculator produced the following output:\n25"));
}

#[tokio::test]
async fn budget_applies_through_crew_config() {
    init_logger();
    let noop = Capability::builder("noop")
        .build(Handler::blocking(|_| Ok(Value::Null)))
        .unwrap();
    let engine = scripted(&["thinking", "thinking", "thinking", "final words"]);

    let mut overrides = HashMap::new();
    overrides.insert(
        "actor".to_string(),
        serde_json::to_value(ActorConfig {
            max_iterations: 3,
            ..ActorConfig::default()
        })
        .unwrap(),
    );
    let config = CrewConfig::default().with_overrides(&overrides).unwrap();

    let mut crew = Crew::new("budget").with_config(config);
    crew.add_agent(
        Agent::new("Ponderer", "think", engine.clone())
            .with_capabilities(CapabilitySet::try_from_iter([noop]).unwrap()),
    );
    let output = crew.kickoff().await.unwrap();
    assert_eq!(engine.calls(), 4);
    assert!(output.tasks_output[0].budget_exhausted);
    assert_eq!(output.raw, "final words");
}

#[tokio::test]
async fn kickoff_twice_resets_state() {
    init_logger();
    let engine = scripted(&["first run", "second run"]);
    let mut crew = Crew::new("rerun");
    crew.add_agent(Agent::new("Solo", "say something", engine.clone()));

    assert_eq!(crew.kickoff().await.unwrap().raw, "first run");
    assert_eq!(crew.kickoff().await.unwrap().raw, "second run");
}

#[tokio::test]
async fn engine_failure_stops_the_run() {
    init_logger();
    let downstream = scripted(&["never"]);
    let mut crew = Crew::new("failing");
    let na = crew.add_agent(Agent::new("Broken", "a", scripted(&[])));
    let nb = crew.add_agent(Agent::new("Downstream", "b", downstream.clone()));
    crew.precede(na, nb).unwrap();

    let err = crew.kickoff().await.unwrap_err();
    assert!(matches!(err, CrewError::Agent { ref agent, .. } if agent == "Broken"));
    assert_eq!(downstream.calls(), 0);
}

#[tokio::test]
async fn shared_names_do_not_hide_ancestor_context() {
    init_logger();
    let sink = scripted(&["merged"]);
    let mut crew = Crew::new("diamond");
    let first = crew.add_agent(Agent::new("Worker", "first half", scripted(&["ANCESTOR_A"])));
    let second = crew.add_agent(Agent::new("Worker", "second half", scripted(&["DIRECT_C"])));
    let mid = crew.add_agent(Agent::new("Mid", "refine", scripted(&["MID_B"])));
    let end = crew.add_agent(Agent::new("Sink", "merge", sink.clone()));
    crew.precede(first, mid).unwrap();
    crew.precede(mid, end).unwrap();
    crew.precede(second, end).unwrap();

    crew.kickoff().await.unwrap();

    let texts: Vec<&str> = crew
        .agent(end)
        .unwrap()
        .context()
        .iter()
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(texts, vec!["DIRECT_C", "ANCESTOR_A", "MID_B"]);
    let prompt = last_instruction(&sink);
    assert!(prompt.contains("Worker produced the following output:\nANCESTOR_A"));
    assert!(prompt.contains("Worker produced the following output:\nDIRECT_C"));
}

#[tokio::test(start_paused = true)]
async fn parallel_failure_finishes_wave_then_stops() {
    init_logger();
    let slow = Arc::new(ScriptedEngine::new(["from b"]).with_delay(Duration::from_millis(50)));
    let downstream = scripted(&["never"]);
    let mut crew = Crew::new("parallel-failing").with_config(CrewConfig {
        process: Process::Parallel,
        ..CrewConfig::default()
    });
    let na = crew.add_agent(Agent::new("Broken", "a", scripted(&[])));
    let nb = crew.add_agent(Agent::new("Slow", "b", slow.clone()));
    let nc = crew.add_agent(Agent::new("Downstream", "c", downstream.clone()));
    crew.precede_all(&[na, nb], &[nc]).unwrap();

    let err = crew.kickoff().await.unwrap_err();
    assert!(matches!(err, CrewError::Agent { ref agent, .. } if agent == "Broken"));
    assert_eq!(slow.calls(), 1);
    assert_eq!(crew.agent(nb).unwrap().output().map(|o| o.raw.as_str()), Some("from b"));
    assert_eq!(downstream.calls(), 0);
}
