//! End-to-end exchange against a local WebSocket server.

use futures::{SinkExt, StreamExt};
use glam::Vec3;
use remoteview_common::Vertex;
use remoteview_input::DeviceInput;
use remoteview_protocol::{
    Frame, InputEvent, InputKind, Message, MeshData, SceneRequest, Timestamps,
};
use remoteview_session::{ConnectionState, FrameOutcome, Session, WsConnector};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite;

fn tetra() -> MeshData {
    let colour = [255, 255, 255, 255];
    let corners = [
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
    ];
    let vertices: Vec<Vertex> = corners
        .iter()
        .map(|&p| Vertex::new(p, p.normalize(), colour))
        .collect();
    MeshData::from_parts(&vertices, &[0, 1, 2, 0, 3, 1, 0, 2, 3, 1, 3, 2])
}

async fn expect_text(ws: &mut tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> String {
    match ws.next().await.unwrap().unwrap() {
        tungstenite::Message::Text(text) => text.as_str().to_owned(),
        other => panic!("expected text, got {other:?}"),
    }
}

#[tokio::test]
async fn scene_request_mesh_input_and_patch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        assert_eq!(expect_text(&mut ws).await, "tetra");
        let stamps = Timestamps {
            client_send_echo: 0,
            server_recv: 5,
            server_send: 7,
        };
        let full = Frame::new(stamps, Message::FullMesh(tetra())).encode();
        ws.send(tungstenite::Message::Binary(full)).await.unwrap();
        assert_eq!(expect_text(&mut ws).await, "got");

        let event = match ws.next().await.unwrap().unwrap() {
            tungstenite::Message::Binary(data) => InputEvent::decode(&data).unwrap(),
            other => panic!("expected binary input, got {other:?}"),
        };
        assert_eq!(event.kind, InputKind::Key);
        assert_eq!(event.keycode, 65);
        assert!(event.down);
        assert_eq!(event.timestamp, 42);

        let patch = MeshData::from_parts(
            &[Vertex::new(Vec3::ZERO, Vec3::Z, [255, 0, 0, 255])],
            &[],
        );
        let frame = Frame::new(
            Timestamps {
                client_send_echo: event.timestamp,
                ..stamps
            },
            Message::RegionPatch {
                vertex_offset: 2,
                index_offset: 0,
                mesh: patch,
            },
        )
        .encode();
        ws.send(tungstenite::Message::Binary(frame)).await.unwrap();
        assert_eq!(expect_text(&mut ws).await, "gotregion");

        ws.close(None).await.unwrap();
    });

    let mut session = Session::new(WsConnector);
    session.connect(&format!("127.0.0.1:{port}")).await.unwrap();
    assert_eq!(session.state(), ConnectionState::Open);
    assert!(session.request_scene(SceneRequest::Tetra).await.unwrap());

    let report = session.next_frame().await.unwrap();
    assert_eq!(
        report.outcome,
        FrameOutcome::MeshReplaced {
            vertex_count: 4,
            index_count: 12
        }
    );
    assert_eq!(report.latency.unwrap().server_processing(), 2);

    let key = DeviceInput::Key {
        keycode: 65,
        pressed: true,
    };
    assert!(session.send_input(&key, 42).await.unwrap());

    let report = session.next_frame().await.unwrap();
    assert!(matches!(report.outcome, FrameOutcome::RegionPatched { .. }));
    assert_eq!(session.scene().buffer.index_count(), 12);

    assert!(session.next_frame().await.is_none());
    assert_eq!(session.state(), ConnectionState::Closed);
    assert_eq!(session.stats().acks_sent, 2);

    server.await.unwrap();
}
