// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The embedded GitHub definition loads into the expected component shape.

use pipewright_component::find_component;
use pipewright_github::events::EVENT_STAR_CREATED;
use pipewright_github::tasks;
use serde_json::json;

#[test]
fn test_definition_metadata() {
    let definition = pipewright_github::definition().unwrap();

    assert_eq!(definition.id, "github");
    assert_eq!(definition.name, "component-definitions/github");
    assert_eq!(definition.title, "GitHub");
    assert_eq!(definition.vendor, "GitHub");
    assert_eq!(definition.extra["type"], "COMPONENT_TYPE_APPLICATION");

    let serialized = serde_json::to_value(definition).unwrap();
    assert_eq!(serialized["documentationUrl"], "https://docs.github.com/en/rest");
    assert!(serialized.get("availableTasks").is_none());
}

#[test]
fn test_task_cards_follow_available_tasks() {
    let definition = pipewright_github::definition().unwrap();

    let names: Vec<&str> = definition.task_names().collect();
    assert_eq!(
        names,
        vec![
            tasks::TASK_LIST_PULL_REQUESTS,
            tasks::TASK_GET_PULL_REQUEST,
            tasks::TASK_LIST_REVIEW_COMMENTS,
            tasks::TASK_CREATE_REVIEW_COMMENT,
            tasks::TASK_GET_COMMIT,
            tasks::TASK_LIST_ISSUES,
            tasks::TASK_GET_ISSUE,
            tasks::TASK_CREATE_ISSUE,
            tasks::TASK_CREATE_WEBHOOK,
        ]
    );

    let card = definition.task_card(tasks::TASK_LIST_PULL_REQUESTS).unwrap();
    assert_eq!(card.title, "List Pull Requests");
    assert_eq!(card.description, "Get the list of pull requests of a repository");
}

#[test]
fn test_component_specification_shape() {
    let definition = pipewright_github::definition().unwrap();
    let spec = &definition.spec.component_specification;

    assert_eq!(spec["$schema"], "http://json-schema.org/draft-07/schema#");
    assert_eq!(spec["title"], "GitHub Component");
    assert_eq!(spec["oneOf"].as_array().unwrap().len(), 9);

    let branch = &spec["oneOf"][6]["properties"];
    assert_eq!(branch["task"]["const"], tasks::TASK_GET_ISSUE);
    assert_eq!(branch["condition"]["uiOrder"], 1);

    let repository = &branch["input"]["properties"]["repository"];
    assert_eq!(repository["title"], "Repository");
    assert_eq!(repository["shortDescription"], "owner/repo");
    assert_eq!(repository["upstreamTypes"], json!(["value", "reference", "template"]));
    let kinds: Vec<_> = repository["anyOf"]
        .as_array()
        .unwrap()
        .iter()
        .map(|branch| branch["upstreamType"].clone())
        .collect();
    assert_eq!(kinds, vec![json!("value"), json!("reference"), json!("template")]);

    let token = &spec["properties"]["setup"]["properties"]["token"];
    assert_eq!(token["secret"], true);
    assert!(token["shortDescription"].is_string());
}

#[test]
fn test_data_specifications_are_formatted() {
    let definition = pipewright_github::definition().unwrap();

    let data = definition.data_specification(tasks::TASK_GET_ISSUE).unwrap();
    let input = data.input.to_value().unwrap();
    assert_eq!(input["properties"]["repository"]["type"], "string");
    assert!(input["properties"]["repository"].get("anyOf").is_none());

    let output = data.output.as_ref().unwrap().to_value().unwrap();
    assert_eq!(output["title"], "Output");
    assert_eq!(output["properties"]["html-url"]["outputFormat"], "url");
    assert_eq!(output["properties"]["user"]["properties"]["login"]["type"], "string");
}

#[test]
fn test_field_index() {
    let definition = pipewright_github::definition().unwrap();

    assert!(definition.is_secret_field("token"));
    assert_eq!(definition.secret_fields(), &["token".to_string()]);
    assert_eq!(
        definition.accept_formats(tasks::TASK_CREATE_ISSUE, "labels"),
        &["array:string".to_string()]
    );
    assert_eq!(
        definition.output_format(tasks::TASK_GET_PULL_REQUEST, "diff-url"),
        Some("url")
    );
    assert!(definition.accept_formats(tasks::TASK_GET_ISSUE, "missing").is_empty());
    assert_eq!(
        definition.accept_formats(tasks::TASK_CREATE_REVIEW_COMMENT, "comment.line"),
        &["integer".to_string()]
    );
    assert_eq!(
        definition.output_format(tasks::TASK_GET_COMMIT, "message"),
        Some("markdown")
    );
}

#[test]
fn test_resolved_task_schemas_keep_defaults() {
    let definition = pipewright_github::definition().unwrap();
    let input = definition
        .task_input_schema(tasks::TASK_LIST_ISSUES)
        .unwrap()
        .to_value()
        .unwrap();
    assert_eq!(input["properties"]["per-page"]["default"], 30);
    assert_eq!(input["properties"]["per-page"]["uiOrder"], 6);
}

#[test]
fn test_star_event_specification() {
    let definition = pipewright_github::definition().unwrap();
    let event = definition.event_specification(EVENT_STAR_CREATED).unwrap();
    assert_eq!(event.title, "Star Created");
    assert_eq!(event.message_examples[0]["action"], "created");
}

#[test]
fn test_component_is_registered() {
    let registration = find_component("github").unwrap();
    let definition = (registration.definition)().unwrap();
    assert!(std::ptr::eq(definition, pipewright_github::definition().unwrap()));
}
