//! Concurrency properties of the matchmaking pool.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use server::pool::MatchmakingPool;
use server::session::Agent;
use shared::net::Connection;
use shared::policy::RandomPolicy;

fn bot(name: String) -> Agent {
    Agent::builtin(Box::new(RandomPolicy::seeded(0)), name)
}

/// Under N concurrent submissions with cohort size K, exactly floor(N / K)
/// cohorts form and no agent lands in two of them.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_submissions_form_disjoint_cohorts() {
    const N: usize = 24;
    const K: usize = 2;

    let pool = Arc::new(MatchmakingPool::new(K));
    let mut handles = Vec::new();
    for i in 0..N {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            pool.submit("storm", bot(format!("agent-{}", i))).await
        }));
    }

    let mut cohorts = Vec::new();
    for handle in handles {
        if let Some(cohort) = handle.await.unwrap() {
            cohorts.push(cohort);
        }
    }

    assert_eq!(cohorts.len(), N / K);
    let mut seen = HashSet::new();
    for cohort in &cohorts {
        assert_eq!(cohort.len(), K);
        for agent in cohort {
            assert!(
                seen.insert(agent.name().to_string()),
                "{} was matched into two cohorts",
                agent.name()
            );
        }
    }
    assert_eq!(seen.len(), N);
    assert_eq!(pool.waiting_count("storm").await, 0);
}

/// With a remainder, the leftover agents stay waiting.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn remainder_agents_keep_waiting() {
    const N: usize = 7;
    const K: usize = 3;

    let pool = Arc::new(MatchmakingPool::new(K));
    let mut handles = Vec::new();
    for i in 0..N {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            pool.submit("trio", bot(format!("agent-{}", i))).await
        }));
    }

    let mut formed = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            formed += 1;
        }
    }
    assert_eq!(formed, N / K);
    assert_eq!(pool.waiting_count("trio").await, N % K);
}

/// A waiting agent whose connection has gone away is purged on the next
/// submission instead of being matched.
#[test]
fn stale_entries_are_purged_not_matched() {
    tokio_test::block_on(async {
        let pool = MatchmakingPool::new(2);

        // A remote agent whose client immediately goes away.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (served, _) = listener.accept().await.unwrap();
        let ghost = Agent::remote(Connection::new(served), "ghost");

        assert!(pool.submit("haunted", ghost).await.is_none());
        assert_eq!(pool.waiting_count("haunted").await, 1);
        drop(client);

        // The next submission purges the ghost and waits alone.
        assert!(pool.submit("haunted", bot("living".to_string())).await.is_none());
        assert_eq!(pool.waiting_count("haunted").await, 1);

        // And a third forms a cohort with the living agent only.
        let cohort = pool
            .submit("haunted", bot("second".to_string()))
            .await
            .expect("two live agents are enough");
        let names: Vec<&str> = cohort.iter().map(Agent::name).collect();
        assert_eq!(names, vec!["living", "second"]);
    });
}
