//! Registry behaviour under concurrent access

use std::sync::Arc;

use agentpay_agents::{AgentConfig, AgentRegistry, AgentStatus};
use agentpay_session::SessionKeyManager;
use agentpay_types::{Address, ManualClock};
use chrono::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_and_reads() {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let registry = Arc::new(AgentRegistry::new(SessionKeyManager::new(clock.clone())));
    let wallet = Address::repeat_byte(0x42);

    let mut handles = Vec::new();
    for i in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let agent = registry
                .create(
                    AgentConfig::new(format!("agent-{i}"), wallet, Duration::minutes(10)),
                    8453,
                )
                .unwrap();
            registry.get(&agent.id).unwrap();
            agent.id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(registry.list(&wallet).len(), 16);

    clock.advance(Duration::minutes(11));
    let mut readers = Vec::new();
    for id in ids {
        let registry = registry.clone();
        readers.push(tokio::spawn(async move { registry.get(&id).unwrap().status }));
    }
    for reader in readers {
        assert_eq!(reader.await.unwrap(), AgentStatus::Expired);
    }
}
