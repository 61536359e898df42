// 相関エンジンの統合テスト
// スクリプト化したトランスポートで、応答の振り分けと完了保証を確認する

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use jrpc::jsonrpc::{
    Batch, Call, CallId, Client, ClientError, Pending, Transport, TransportError,
};
use jrpc::Logger;
use reqwest::Url;
use serde_json::{json, Value};
use tokio::sync::mpsc;

type Reply = dyn Fn(&Value) -> Result<Vec<u8>, TransportError> + Send + Sync;

/// Records every payload and answers with a scripted reply
struct ScriptedTransport {
    sent: mpsc::UnboundedSender<Value>,
    reply: Box<Reply>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let wire: Value = serde_json::from_slice(&body).expect("client sends valid JSON");
        let reply = (self.reply)(&wire);
        let _ = self.sent.send(wire);
        reply
    }
}

fn scripted<F>(reply: F) -> (Client, mpsc::UnboundedReceiver<Value>)
where
    F: Fn(&Value) -> Result<Vec<u8>, TransportError> + Send + Sync + 'static,
{
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let (sent, rx) = mpsc::unbounded_channel();
    let transport = ScriptedTransport {
        sent,
        reply: Box::new(reply),
    };
    let endpoint = Url::parse("http://localhost:4567/json_rpc").unwrap();
    let client = Client::with_transport(endpoint, Arc::new(transport)).with_logger(Logger::global());
    (client, rx)
}

/// Answer every request carrying an id, echoing its params as the result
fn echo_all(wire: &Value) -> Result<Vec<u8>, TransportError> {
    let answers: Vec<Value> = wire
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r.get("id").is_some())
        .map(|r| json!({"id": r["id"], "jsonrpc": "2.0", "result": r.get("params").cloned().unwrap_or(json!("ok"))}))
        .collect();
    Ok(serde_json::to_vec(&answers).unwrap())
}

#[tokio::test]
async fn test_wire_array_counts_ids() {
    let (client, mut sent) = scripted(echo_all);

    let mut batch = client.batch_request();
    for i in 0..3 {
        batch.method("m", Some(json!(i)), None).unwrap();
    }
    batch.notify("n1", None).unwrap();
    batch.notify("n2", None).unwrap();
    let all = batch.send(None).unwrap().unwrap();

    let wire = sent.recv().await.unwrap();
    let requests = wire.as_array().unwrap();
    assert_eq!(requests.len(), 5);
    assert_eq!(requests.iter().filter(|r| r.get("id").is_some()).count(), 3);
    assert_eq!(requests.iter().filter(|r| r.get("id").is_none()).count(), 2);
    assert!(requests.iter().all(|r| r["jsonrpc"] == json!("2.0")));

    assert_eq!(all.await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_every_call_gets_its_own_answer() {
    let (client, _sent) = scripted(echo_all);

    let mut batch = client.batch_request();
    let futures: Vec<_> = (0..10)
        .map(|i| batch.method("echo", Some(json!(i)), None).unwrap())
        .collect();
    let all = batch.send(None).unwrap().unwrap();

    for (i, future) in futures.into_iter().enumerate() {
        assert_eq!(future.await.unwrap().result, json!(i));
    }
    assert_eq!(all.await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_reference_scenario() {
    let (client, _sent) = scripted(|wire| {
        let m1 = &wire[0]["id"];
        let m2 = &wire[2]["id"];
        Ok(format!(
            r#"[{{"id":{},"jsonrpc":"2.0","result":"ok"}},{{"id":{},"jsonrpc":"2.0","error":{{"code":-32601,"message":"nope"}}}}]"#,
            m1, m2
        )
        .into_bytes())
    });

    let mut batch = client.batch_request();
    let m1 = batch.method("m1", None, None).unwrap();
    batch.notify("n1", None).unwrap();
    let m2 = batch.method("m2", Some(json!("q")), None).unwrap();
    let all = batch.send(None).unwrap().unwrap();

    assert_eq!(all.await.unwrap().len(), 2);
    assert_eq!(m1.await.unwrap().result, json!("ok"));
    let failure = m2.await.unwrap_err();
    assert_eq!(failure.error.code, -32601);
    assert_eq!(failure.error.message, "nope");
}

#[tokio::test]
async fn test_missing_answer_is_scoped_to_one_call() {
    let (client, _sent) = scripted(|wire| {
        let answered = &wire[0]["id"];
        Ok(format!(r#"[{{"id":{},"jsonrpc":"2.0","result":"ok"}}]"#, answered).into_bytes())
    });

    let mut batch = client.batch_request();
    let answered = batch.method("answered", None, None).unwrap();
    let ignored = batch.method("ignore_me", Some(json!("q")), None).unwrap();
    let all = batch.send(None).unwrap().unwrap();

    assert_eq!(all.await.unwrap().len(), 1);
    assert_eq!(answered.await.unwrap().result, json!("ok"));
    let failure = ignored.clone().await.unwrap_err();
    assert_eq!(failure.error.code, 12701);
    assert_eq!(failure.id.as_ref(), Some(ignored.id()));
}

#[tokio::test]
async fn test_transport_failure_fails_everything() {
    let (client, _sent) = scripted(|_| Err(TransportError::Timeout));

    let mut batch = client.batch_request();
    let a = batch.method("a", None, None).unwrap();
    let b = batch.method("b", None, None).unwrap();
    batch.notify("n", None).unwrap();
    let all = batch.send(None).unwrap().unwrap();

    assert_eq!(all.await.unwrap_err().code, 12600);
    assert_eq!(a.await.unwrap_err().error.code, 12600);
    assert_eq!(b.await.unwrap_err().error.code, 12600);
}

#[tokio::test]
async fn test_invalid_reply_fails_everything() {
    let (client, _sent) = scripted(|_| Ok(b"<html>502 Bad Gateway</html>".to_vec()));

    let future = client.method("anything", Some(json!("q")), None).unwrap();
    let failure = future.await.unwrap_err();
    assert_eq!(failure.error.code, 12700);
    assert!(failure.error.message.contains("invalid JSON"));
}

#[tokio::test]
async fn test_notification_only_batch_still_posts() {
    let (client, mut sent) = scripted(|_| Ok(Vec::new()));

    let mut batch = client.batch_request();
    batch.notify("n1", Some(json!([1]))).unwrap();
    batch.notify("n2", None).unwrap();
    assert!(batch.send(None).unwrap().is_none());

    let wire = sent.recv().await.unwrap();
    assert_eq!(
        wire,
        json!([
            {"jsonrpc": "2.0", "method": "n1", "params": [1]},
            {"jsonrpc": "2.0", "method": "n2"}
        ])
    );
}

#[tokio::test]
async fn test_client_send_shapes() {
    let (client, mut sent) = scripted(echo_all);

    let single = client
        .send(Call::method("one", Some(json!(1)), None).unwrap())
        .unwrap()
        .unwrap();
    let Pending::Single(single) = single else {
        panic!("single call must yield a single future");
    };
    assert_eq!(single.await.unwrap().result, json!(1));
    assert_eq!(sent.recv().await.unwrap().as_array().unwrap().len(), 1);

    let calls = vec![
        Call::method("two", Some(json!(2)), Some(CallId::Number(2))).unwrap(),
        Call::notification("ping", None).unwrap(),
    ];
    let set = client.send(calls).unwrap().unwrap().into_batch().unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.get(&CallId::Number(2)).unwrap().clone().await.unwrap().result, json!(2));

    assert!(client.send(Call::notification("ping", None).unwrap()).unwrap().is_none());
    client.notify("ping", None).unwrap();
    assert!(matches!(
        client.send(Vec::<Call>::new()),
        Err(ClientError::EmptyDispatch)
    ));
}

#[tokio::test]
async fn test_subscribers_before_and_after_completion() {
    let (client, _sent) = scripted(echo_all);
    let hits = Arc::new(AtomicUsize::new(0));

    let mut batch = client.batch_request();
    let future = batch.method("m", Some(json!("v")), None).unwrap();
    let h = hits.clone();
    future.on_success(move |answer| {
        assert_eq!(answer.result, json!("v"));
        h.fetch_add(1, Ordering::SeqCst);
    });

    let all = batch.send(None).unwrap().unwrap();
    all.clone().await.unwrap();
    future.clone().await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let h = hits.clone();
    future.on_success(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });
    let h = hits.clone();
    all.on_success(move |replies| {
        assert_eq!(replies.len(), 1);
        h.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_panicking_batch_subscriber_does_not_block_calls() {
    let (client, _sent) = scripted(echo_all);
    let hits = Arc::new(AtomicUsize::new(0));

    let mut batch = client.batch_request();
    let futures: Vec<_> = (0..3)
        .map(|i| batch.method("m", Some(json!(i)), None).unwrap())
        .collect();
    for future in &futures {
        let h = hits.clone();
        future.on_success(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
    }
    let all = batch.send(None).unwrap().unwrap();
    all.on_success(|_| panic!("subscriber fault while processing the batch"));

    assert_eq!(all.await.unwrap().len(), 3);
    for future in futures {
        future.await.unwrap();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_concurrent_dispatches_are_independent() {
    let (client, _sent) = scripted(echo_all);

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                let future = client.method("echo", Some(json!(i)), None).unwrap();
                future.await.unwrap().result
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), json!(i));
    }
}

#[tokio::test]
async fn test_unbound_batch_uses_explicit_client() {
    let (client, _sent) = scripted(echo_all);

    let mut batch = Batch::new();
    let future = batch.method("m", Some(json!("x")), None).unwrap();
    batch.send(Some(&client)).unwrap().unwrap();
    assert_eq!(future.await.unwrap().result, json!("x"));
}

#[tokio::test]
async fn test_unbound_batch_survives_missing_client() {
    let (client, mut sent) = scripted(echo_all);

    let mut batch = Batch::new();
    let future = batch.method("m", Some(json!("y")), None).unwrap();
    batch.notify("n", None).unwrap();

    let rejected = batch.send(None).unwrap_err();
    assert!(matches!(rejected.error, ClientError::MissingClient));
    assert!(future.is_pending());
    assert!(sent.try_recv().is_err());

    let all = rejected.into_batch().send(Some(&client)).unwrap().unwrap();
    assert_eq!(sent.recv().await.unwrap().as_array().unwrap().len(), 2);
    assert_eq!(future.await.unwrap().result, json!("y"));
    assert_eq!(all.await.unwrap().len(), 1);
}
