use draft_stage::{CdpChannel, StageError};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::future::Future;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

type Socket = WebSocketStream<TcpStream>;

/// Accept one debugger connection and hand it to `script`
async fn mock_debugger<F, Fut>(script: F) -> String
where
    F: FnOnce(Socket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let socket = accept_async(stream).await.unwrap();
        script(socket).await;
    });
    format!("ws://{}/devtools/page/MOCK", addr)
}

async fn next_request(socket: &mut Socket) -> Value {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("socket ended early: {:?}", other),
        }
    }
}

async fn reply(socket: &mut Socket, body: Value) {
    socket.send(Message::text(body.to_string())).await.unwrap();
}

async fn connect(url: &str, command_timeout: Duration) -> CdpChannel {
    CdpChannel::connect(url, Duration::from_secs(2), command_timeout).await.unwrap()
}

#[tokio::test]
async fn test_replies_are_routed_by_id_under_reordering() {
    let url = mock_debugger(|mut socket| async move {
        let mut requests = Vec::new();
        for _ in 0..3 {
            requests.push(next_request(&mut socket).await);
        }
        reply(&mut socket, json!({ "method": "Runtime.consoleAPICalled", "params": {} })).await;
        for request in requests.iter().rev() {
            let body = json!({ "id": request["id"], "result": { "method": request["method"], "id": request["id"] } });
            reply(&mut socket, body).await;
        }
        let _ = socket.next().await;
    })
    .await;

    let channel = connect(&url, Duration::from_secs(2)).await;
    let (a, b, c) = tokio::join!(
        channel.call("Page.enable", json!({})),
        channel.call("Runtime.enable", json!({})),
        channel.call("DOM.enable", json!({})),
    );

    for (result, method) in [(a, "Page.enable"), (b, "Runtime.enable"), (c, "DOM.enable")] {
        assert_eq!(result.unwrap()["method"], method);
    }
}

#[tokio::test]
async fn test_remote_errors_are_typed() {
    let url = mock_debugger(|mut socket| async move {
        let first = next_request(&mut socket).await;
        reply(&mut socket, json!({ "id": first["id"], "error": { "code": -32000, "message": "Cannot find context" } }))
            .await;
        let second = next_request(&mut socket).await;
        reply(&mut socket, json!({ "id": second["id"], "error": { "code": -32000, "message": "Target closed." } })).await;
        let _ = socket.next().await;
    })
    .await;

    let channel = connect(&url, Duration::from_secs(2)).await;

    match channel.call("Runtime.evaluate", json!({ "expression": "1" })).await {
        Err(StageError::RemoteError { method, code, message }) => {
            assert_eq!(method, "Runtime.evaluate");
            assert_eq!(code, -32000);
            assert_eq!(message, "Cannot find context");
        }
        other => panic!("unexpected {:?}", other),
    }

    let err = channel.call("Runtime.evaluate", json!({ "expression": "2" })).await.unwrap_err();
    assert!(err.is_channel_failure(), "{:?}", err);
}

#[tokio::test]
async fn test_closure_fails_every_pending_call() {
    let url = mock_debugger(|mut socket| async move {
        for _ in 0..4 {
            next_request(&mut socket).await;
        }
        socket.close(None).await.unwrap();
    })
    .await;

    let channel = connect(&url, Duration::from_secs(5)).await;
    let results = futures_util::future::join_all((0..4).map(|i| {
        channel.call("Runtime.evaluate", json!({ "expression": i.to_string() }))
    }))
    .await;

    assert_eq!(results.len(), 4);
    for result in results {
        assert!(matches!(result, Err(StageError::ChannelClosed(_))), "{:?}", result);
    }
    assert!(channel.is_closed());

    let late = channel.call("Page.bringToFront", json!({})).await;
    assert!(matches!(late, Err(StageError::ChannelClosed(_))));
}

#[tokio::test]
async fn test_silent_remote_times_out() {
    let url = mock_debugger(|mut socket| async move {
        let _ = next_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
    })
    .await;

    let channel = connect(&url, Duration::from_millis(50)).await;
    let err = channel.call("Runtime.evaluate", json!({})).await.unwrap_err();

    assert!(matches!(err, StageError::CommandTimeout { timeout_ms: 50, .. }));
    assert!(err.is_channel_failure());
}

#[tokio::test]
async fn test_unreachable_socket_is_connection_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = CdpChannel::connect(
        &format!("ws://{}/devtools/page/GONE", addr),
        Duration::from_secs(1),
        Duration::from_secs(1),
    )
    .await;

    assert!(matches!(result, Err(StageError::ConnectionFailed { .. })));
}
