// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ck_core::test_support::{shell_job, store_of};
use ck_core::SystemClock;
use ck_daemon::{Agent, Listener};
use ck_engine::{JobExecutor, SessionAssistant};
use ck_storage::SessionRepository;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tempfile::TempDir;

async fn serve() -> (TempDir, SocketAddr) {
    let dir = tempfile::tempdir().unwrap();
    let repo = SessionRepository::new(dir.path()).unwrap();
    let units = store_of([shell_job("ns::a", "echo hi")]);
    let agent = Arc::new(Agent::new(SessionAssistant::new(units, repo, JobExecutor::new(SystemClock)).with_root(false)));
    let tcp = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let listener = Listener::new(tcp, agent);
    let addr = listener.local_addr().unwrap();
    tokio::spawn(listener.run());
    (dir, addr)
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    let port = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap().local_addr().unwrap().port();
    let err = AgentClient::connect(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).await.err().unwrap();
    assert!(err.is_unreachable());
}

#[test]
fn refusals_are_not_unreachable() {
    assert!(!ClientError::Busy(None).is_unreachable());
    assert!(!ClientError::Rejected("nope".into()).is_unreachable());
    assert!(ClientError::Protocol(ProtocolError::ConnectionClosed).is_unreachable());
}

#[tokio::test]
async fn one_connection_carries_many_requests() {
    let (_dir, addr) = serve().await;
    let mut client = AgentClient::connect(addr).await.unwrap();

    let greeting = client.hello().await.unwrap();
    assert_eq!(greeting.version, PROTOCOL_VERSION);
    assert_eq!(greeting.active_session, None);
    client.ping().await.unwrap();
    assert!(client.list_resumable().await.unwrap().is_empty());

    let (session, run_list) = client.start_new(LauncherConfig::default(), vec![JobId::new("ns::a")]).await.unwrap();
    assert_eq!(run_list, vec![JobId::new("ns::a")]);
    assert!(matches!(client.request_next_job().await.unwrap(), NextJob::Finished { result, .. } if result.outcome == Outcome::Pass));
    assert_eq!(client.request_next_job().await.unwrap(), NextJob::SessionDone(session.clone()));

    let result = client.get_job_result(&JobId::new("ns::a")).await.unwrap().unwrap();
    assert_eq!(result.stdout(), b"hi\n");
    assert_eq!(client.get_state().await.unwrap().map(|s| s.id), Some(session));
    assert!(!client.abort().await.unwrap());
}

#[tokio::test]
async fn second_driver_is_told_busy() {
    let (_dir, addr) = serve().await;
    let mut first = AgentClient::connect(addr).await.unwrap();
    let (session, _) = first.start_new(LauncherConfig::default(), vec![JobId::new("ns::a")]).await.unwrap();

    let mut second = AgentClient::connect(addr).await.unwrap();
    let err = second.request_next_job().await.unwrap_err();
    assert!(matches!(err, ClientError::Busy(Some(id)) if id == session));
}

#[tokio::test]
async fn agent_errors_are_rejections() {
    let (_dir, addr) = serve().await;
    let mut client = AgentClient::connect(addr).await.unwrap();
    let err = client.resume(&SessionId::new("ses-missing")).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(_)));
}
