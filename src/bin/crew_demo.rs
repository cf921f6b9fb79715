//! Weather-and-mail crew demo.
//!
//! Runs a two-agent crew against scripted completion engines: a weather
//! reporter calls stub weather capabilities, and a mail assistant turns the
//! report into an email. An orchestrator then answers a question by
//! delegating to the same weather reporter.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: tracing filter (default: "info,agentcrew=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin crew_demo
//! # or with a YAML crew config:
//! cargo run --bin crew_demo -- crew.yaml
//! ```

use std::sync::Arc;

use anyhow::Context;
use serde_json::json;

use agentcrew::llms::ScriptedEngine;
use agentcrew::utilities::errors::BoxError;
use agentcrew::{
    Agent, AgentBlueprint, Capability, CapabilitySet, Crew, CrewConfig, Handler, Orchestrator,
};

fn weather_capabilities() -> anyhow::Result<CapabilitySet> {
    let weather = Capability::builder("get_weather")
        .description("Current weather for a location")
        .param("location", "str")
        .optional_param("unit", "str", json!("celsius"))
        .build(Handler::blocking(|args| {
            Ok(json!({
                "location": args["location"],
                "temperature": 22,
                "unit": args["unit"],
            }))
        }))?;
    let humidity = Capability::builder("get_humidity")
        .description("Relative humidity for a location")
        .param("location", "str")
        .build(Handler::blocking(|args| {
            Ok(json!({"location": args["location"], "humidity": 0.41}))
        }))?;
    Ok(CapabilitySet::try_from_iter([weather, humidity])?)
}

fn mail_capabilities() -> anyhow::Result<CapabilitySet> {
    let get_mails = Capability::builder("get_mails")
        .description("Latest mails in the inbox")
        .optional_param("limit", "int", json!(5))
        .build(Handler::blocking(|args| {
            let limit = args["limit"].as_i64().unwrap_or(5);
            Ok(json!({"mails": [], "limit": limit}))
        }))?;
    let send_mail = Capability::builder("send_mail")
        .description("Send a mail")
        .param("to", "str")
        .param("subject", "str")
        .param("body", "str")
        .build(Handler::from_async(|args| async move {
            tracing::info!("Sending mail to {}", args["to"]);
            Ok::<_, BoxError>(json!({"status": "sent", "to": args["to"]}))
        }))?;
    Ok(CapabilitySet::try_from_iter([get_mails, send_mail])?)
}

fn load_config() -> anyhow::Result<CrewConfig> {
    match std::env::args().nth(1) {
        Some(path) => CrewConfig::from_file(&path)
            .with_context(|| format!("loading crew config from {}", path)),
        None => Ok(CrewConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agentcrew=debug".into()),
        )
        .init();

    let config = load_config()?;
    tracing::info!("agentcrew v{} demo ({} process)", agentcrew::VERSION, config.process);

    let weather_engine = Arc::new(ScriptedEngine::new([
        "<thought>I need the weather and humidity in Madrid</thought>\n\
         <tool_call>{\"name\": \"get_weather\", \"arguments\": {\"location\": \"Madrid\"}, \"id\": 0}</tool_call>\n\
         <tool_call>{\"name\": \"get_humidity\", \"arguments\": {\"location\": \"Madrid\"}, \"id\": 1}</tool_call>",
        "<response>Madrid: 22 degrees celsius, humidity 41%.</response>",
    ]));
    let mail_engine = Arc::new(ScriptedEngine::new([
        "<thought>Send the report to the team</thought>\n\
         <tool_call>{\"name\": \"send_mail\", \"arguments\": {\"to\": \"team@example.com\", \
         \"subject\": \"Weather report\", \"body\": \"Madrid: 22 degrees celsius, humidity 41%.\"}, \"id\": 0}</tool_call>",
        "<response>Weather report sent to team@example.com.</response>",
    ]));

    let mut crew = Crew::new("weather-mail").with_config(config.clone());
    let reporter = crew.add_agent(
        Agent::new(
            "Weather Reporter",
            "Report the current weather and humidity in Madrid",
            weather_engine,
        )
        .with_backstory("You are a meticulous meteorologist.")
        .with_expected_output("One sentence with temperature and humidity")
        .with_capabilities(weather_capabilities()?),
    );
    let mailer = crew.add_agent(
        Agent::new(
            "Mail Assistant",
            "Email the weather report to team@example.com",
            mail_engine,
        )
        .with_capabilities(mail_capabilities()?),
    );
    crew.precede(reporter, mailer)?;

    let output = crew.kickoff().await?;
    for task in &output.tasks_output {
        println!("[{}] {}", task.agent, task.raw);
    }
    println!("Crew result: {}", output);

    let delegate_engine = Arc::new(ScriptedEngine::new([
        "<response>It is 22 degrees celsius in Madrid.</response>",
    ]));
    let orchestrator_engine = Arc::new(ScriptedEngine::new([
        "<thought>The weather agent can answer this</thought>\n\
         <agent_call>{\"name\": \"weather_agent\", \"arguments\": \
         {\"task_description\": \"Current temperature in Madrid\", \"context\": \"\"}, \"id\": 0}</agent_call>",
        "<response>According to the weather agent it is 22 degrees celsius in Madrid.</response>",
    ]));
    let mut orchestrator = Orchestrator::new(orchestrator_engine).with_config(config.actor.clone());
    orchestrator.bind_agent(
        AgentBlueprint::new("weather_agent", delegate_engine)
            .with_description("Answers questions about the current weather")
            .with_capabilities(weather_capabilities()?),
    )?;
    let answer = orchestrator.invoke("How warm is it in Madrid?").await?;
    println!("Orchestrator: {}", answer.text);

    Ok(())
}
