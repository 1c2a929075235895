//! Performance benchmarks for agent-session
//!
//! Run with: cargo bench

use agent_session::{JsonRpcRequest, JsonRpcResponse, Message, ToolParam};
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;

fn bench_message_codec(c: &mut Criterion) {
    let request = Message::Request(JsonRpcRequest::new(
        42,
        "prompt/send",
        Some(json!({"text": "Summarize the quarterly report", "temperature": 0.2})),
    ));

    c.bench_function("Message encode request", |b| {
        b.iter(|| request.encode().unwrap());
    });

    let response_bytes = Message::Response(JsonRpcResponse::success(
        42,
        json!({"answer": "Revenue grew 12% quarter over quarter", "tokens": 183}),
    ))
    .encode()
    .unwrap();

    c.bench_function("Message decode response", |b| {
        b.iter(|| Message::decode(&response_bytes).unwrap());
    });
}

fn bench_schema_derivation(c: &mut Criterion) {
    let params = vec![
        ToolParam::string("path").describe("File to read"),
        ToolParam::number("offset").optional(),
        ToolParam::number("limit").optional(),
        ToolParam::one_of("encoding", ["utf-8", "latin-1"]).default_value(json!("utf-8")),
        ToolParam::boolean("follow_symlinks").default_value(json!(false)),
    ];

    c.bench_function("json_schema 5 params", |b| {
        b.iter(|| agent_session::tools::json_schema(&params));
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("registry invoke", |b| {
        let registry = agent_session::ToolRegistry::new();
        registry
            .register(agent_session::ToolDescriptor::from_fn(
                "add",
                "Add two numbers",
                vec![ToolParam::number("a"), ToolParam::number("b")],
                |args| async move {
                    Ok(json!(args["a"].as_f64().unwrap() + args["b"].as_f64().unwrap()))
                },
            ))
            .unwrap();

        b.iter(|| {
            rt.block_on(async {
                registry
                    .invoke("add", Some(json!({"a": 2, "b": 3})))
                    .await
                    .unwrap()
            })
        });
    });
}

criterion_group!(
    benches,
    bench_message_codec,
    bench_schema_derivation,
    bench_round_trip
);
criterion_main!(benches);
