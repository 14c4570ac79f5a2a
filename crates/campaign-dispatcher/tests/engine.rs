//! Dispatch engine tests against the in-memory stores.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use campaign_dispatcher::memory::{pending_campaign, Fault, MemoryStore, ScriptedConnector, ScriptedGateway};
use campaign_dispatcher::model::{CampaignStatus, DeliveryStatus};
use campaign_dispatcher::{
    AudienceFilters, DispatchConfig, DispatchEngine, DispatchError, DispatchRequest, EngineOptions,
    PacingConfig, RunOutcome, Stores,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const CAMPAIGN: &str = "camp-1";
const TEMPLATE: &str = "tpl-1";
const ADMIN: &str = "699000000";

fn config(admins: &[&str], notification_interval: u32) -> DispatchConfig {
    DispatchConfig {
        api_url: Some("http://gateway.test/api".to_string()),
        api_key: Some("key".to_string()),
        pacing: PacingConfig::immediate(),
        admin_phone_numbers: admins.iter().map(|a| a.to_string()).collect(),
        notification_interval,
    }
}

/// A store with one pending campaign, a greeting template and no admins.
fn store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set_config(config(&[], 50));
    store.add_template(TEMPLATE, "Hola {{name}}");
    store.insert_campaign(pending_campaign(CAMPAIGN, TEMPLATE));
    store
}

fn add_clients(store: &MemoryStore, n: usize) -> Vec<String> {
    (1..=n)
        .map(|i| {
            let phone = format!("600000{:03}", i);
            store.add_client(&format!("c{}", i), &format!("Client {}", i), Some(&phone), "");
            phone
        })
        .collect()
}

struct Harness {
    store: Arc<MemoryStore>,
    gateway: Arc<ScriptedGateway>,
    connector: Arc<ScriptedConnector>,
    engine: DispatchEngine,
}

fn harness(store: Arc<MemoryStore>, gateway: ScriptedGateway) -> Harness {
    let gateway = Arc::new(gateway);
    let connector = Arc::new(ScriptedConnector::new(gateway.clone()));
    let engine = DispatchEngine::new(Stores::shared(store.clone()), connector.clone());
    Harness {
        store,
        gateway,
        connector,
        engine,
    }
}

fn request() -> DispatchRequest {
    DispatchRequest::new(CAMPAIGN, TEMPLATE)
}

fn progress_notices(gateway: &ScriptedGateway) -> usize {
    gateway
        .sent_to(ADMIN)
        .iter()
        .filter(|text| text.contains("progress"))
        .count()
}

#[tokio::test]
async fn test_single_recipient_is_sent_and_completed() {
    let store = store();
    store.add_client("c1", "Ana", Some("600111222"), "");
    let h = harness(store, ScriptedGateway::new());

    let summary = h.engine.run(request()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(h.gateway.sent_to("600111222"), vec!["Hola Ana"]);

    let logs = h.store.logs_for(CAMPAIGN);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, DeliveryStatus::Sent);
    assert_eq!(logs[0].waha_message_id.as_deref(), Some("m1"));
    assert_eq!(logs[0].client_id, "c1");
    assert_eq!(logs[0].template_id, TEMPLATE);

    let campaign = h.store.campaign(CAMPAIGN).unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.processed_count, 1);
    assert_eq!(campaign.success_count, 1);
    assert_eq!(campaign.failed_count, 0);
    assert!(campaign.started_at.is_some());
    assert!(campaign.completed_at.is_some());
    assert!(campaign.error_message.is_none());
}

#[tokio::test]
async fn test_previously_logged_recipient_is_skipped() {
    let store = store();
    let mut campaign = pending_campaign(CAMPAIGN, TEMPLATE);
    campaign.status = CampaignStatus::Paused;
    campaign.processed_count = 1;
    campaign.success_count = 1;
    store.insert_campaign(campaign);
    store.add_client("c1", "Ana", Some("600111222"), "");
    store.add_log(CAMPAIGN, "600111222", DeliveryStatus::Sent);
    let h = harness(store, ScriptedGateway::new());

    let summary = h.engine.run(request()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.skipped, 1);
    assert!(h.gateway.sent().is_empty());

    let campaign = h.store.campaign(CAMPAIGN).unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.processed_count, 1);
    assert_eq!(h.store.logs_for(CAMPAIGN).len(), 1);
}

#[tokio::test]
async fn test_counts_add_up() {
    let store = store();
    let phones = add_clients(&store, 7);
    store.add_log(CAMPAIGN, &phones[0], DeliveryStatus::Sent);
    store.add_log(CAMPAIGN, &phones[3], DeliveryStatus::Failed);
    let gateway = ScriptedGateway::new()
        .fail_phone(phones[1].clone(), "not on WhatsApp")
        .fail_phone(phones[5].clone(), "HTTP 500");
    let h = harness(store, gateway);

    let summary = h.engine.run(request()).await.unwrap();
    let campaign = h.store.campaign(CAMPAIGN).unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(campaign.processed_count as u64 + summary.skipped, 7);
    assert_eq!(
        campaign.success_count + campaign.failed_count,
        campaign.processed_count
    );
    assert_eq!(campaign.failed_count, 2);

    let failed = h
        .store
        .logs_for(CAMPAIGN)
        .into_iter()
        .find(|l| l.client_phone == phones[1])
        .unwrap();
    assert_eq!(failed.status, DeliveryStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("not on WhatsApp"));
    assert!(failed.waha_message_id.is_none());
}

#[tokio::test]
async fn test_rerun_never_duplicates_log_entries() {
    let store = store();
    add_clients(&store, 6);
    let h = harness(store, ScriptedGateway::new());

    h.engine.run(request()).await.unwrap();
    // An admin re-opens the campaign and starts it again.
    h.store.set_status(CAMPAIGN, CampaignStatus::Paused);
    let second = h.engine.run(request()).await.unwrap();

    assert_eq!(second.attempted, 0);
    assert_eq!(second.skipped, 6);

    let logs = h.store.logs_for(CAMPAIGN);
    let pairs: HashSet<(String, String)> = logs
        .iter()
        .map(|l| (l.campaign_id.clone(), l.client_phone.clone()))
        .collect();
    assert_eq!(pairs.len(), logs.len());
    assert_eq!(logs.len(), 6);
}

#[tokio::test]
async fn test_external_pause_stops_the_run() {
    let store = store();
    add_clients(&store, 5);
    let pauser = store.clone();
    let gateway = ScriptedGateway::new().on_send(move |_, sent| {
        if sent == 2 {
            pauser.set_status(CAMPAIGN, CampaignStatus::Paused);
        }
    });
    let h = harness(store, gateway);

    let summary = h.engine.run(request()).await.unwrap();
    let campaign = h.store.campaign(CAMPAIGN).unwrap();

    assert_eq!(summary.outcome, RunOutcome::Stopped(CampaignStatus::Paused));
    assert_eq!(campaign.status, CampaignStatus::Paused);
    assert!(campaign.processed_count <= 3);
    assert_eq!(campaign.processed_count, 2);
    assert!(campaign.completed_at.is_none());
    assert_eq!(h.gateway.sent().len(), 2);
}

#[tokio::test]
async fn test_paused_campaign_resumes_where_it_left_off() {
    let store = store();
    let phones = add_clients(&store, 4);
    let pauser = store.clone();
    let gateway = ScriptedGateway::new().on_send(move |_, sent| {
        if sent == 1 {
            pauser.set_status(CAMPAIGN, CampaignStatus::Paused);
        }
    });
    let h = harness(store, gateway);

    h.engine.run(request()).await.unwrap();
    let resumed = h.engine.run(request()).await.unwrap();

    assert_eq!(resumed.outcome, RunOutcome::Completed);
    assert_eq!(resumed.skipped, 1);
    let campaign = h.store.campaign(CAMPAIGN).unwrap();
    assert_eq!(campaign.processed_count, 4);
    for phone in &phones {
        assert_eq!(h.gateway.sent_to(phone).len(), 1);
    }
}

#[tokio::test]
async fn test_external_terminal_status_is_not_overwritten() {
    let store = store();
    add_clients(&store, 3);
    let closer = store.clone();
    let gateway = ScriptedGateway::new().on_send(move |_, sent| {
        if sent == 3 {
            closer.set_status(CAMPAIGN, CampaignStatus::Failed);
        }
    });
    let h = harness(store, gateway);

    let summary = h.engine.run(request()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Stopped(CampaignStatus::Failed));
    let campaign = h.store.campaign(CAMPAIGN).unwrap();
    assert_eq!(campaign.status, CampaignStatus::Failed);
    assert!(campaign.completed_at.is_none());
}

#[tokio::test]
async fn test_failing_gateway_still_completes() {
    let store = store();
    add_clients(&store, 4);
    let h = harness(store, ScriptedGateway::new().always_fail("session disconnected"));

    let summary = h.engine.run(request()).await.unwrap();
    let campaign = h.store.campaign(CAMPAIGN).unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.failed_count, 4);
    assert_eq!(campaign.success_count, 0);
    assert!(h
        .store
        .logs_for(CAMPAIGN)
        .iter()
        .all(|l| l.status == DeliveryStatus::Failed));
}

#[tokio::test]
async fn test_progress_notice_cadence() {
    let store = store();
    store.set_config(config(&[ADMIN], 2));
    let phones = add_clients(&store, 7);
    // Successes at positions 1, 2, 4, 5, 7 with failures in between.
    let gateway = ScriptedGateway::new()
        .fail_phone(phones[2].clone(), "HTTP 500")
        .fail_phone(phones[5].clone(), "HTTP 500");
    let h = harness(store, gateway);

    h.engine.run(request()).await.unwrap();

    assert_eq!(progress_notices(&h.gateway), 2);
    let admin_texts = h.gateway.sent_to(ADMIN);
    assert!(admin_texts.first().unwrap().contains("started"));
    assert!(admin_texts.last().unwrap().contains("completed"));
}

#[tokio::test]
async fn test_zero_interval_disables_progress_notices() {
    let store = store();
    store.set_config(config(&[ADMIN], 0));
    add_clients(&store, 3);
    let h = harness(store, ScriptedGateway::new());

    h.engine.run(request()).await.unwrap();

    assert_eq!(progress_notices(&h.gateway), 0);
    assert_eq!(h.gateway.sent_to(ADMIN).len(), 2);
}

#[tokio::test]
async fn test_running_campaign_is_rejected() {
    let store = store();
    store.set_status(CAMPAIGN, CampaignStatus::Running);
    add_clients(&store, 2);
    let h = harness(store, ScriptedGateway::new());

    let err = h.engine.run(request()).await.unwrap_err();

    assert!(matches!(err, DispatchError::Precondition(_)));
    assert!(h.gateway.sent().is_empty());
    let campaign = h.store.campaign(CAMPAIGN).unwrap();
    assert_eq!(campaign.status, CampaignStatus::Running);
    assert!(campaign.started_at.is_none());
}

#[tokio::test]
async fn test_completed_campaign_is_rejected() {
    let store = store();
    store.set_status(CAMPAIGN, CampaignStatus::Completed);
    let h = harness(store, ScriptedGateway::new());

    let err = h.engine.run(request()).await.unwrap_err();
    assert!(matches!(err, DispatchError::Precondition(_)));
}

#[tokio::test]
async fn test_unknown_campaign_and_template() {
    let h = harness(store(), ScriptedGateway::new());

    let err = h
        .engine
        .run(DispatchRequest::new("ghost", TEMPLATE))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Precondition(_)));

    let err = h
        .engine
        .run(DispatchRequest::new(CAMPAIGN, "ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Precondition(_)));
    assert_eq!(
        h.store.campaign(CAMPAIGN).unwrap().status,
        CampaignStatus::Pending
    );
}

#[tokio::test]
async fn test_missing_ids_are_payload_errors() {
    let h = harness(store(), ScriptedGateway::new());

    let err = h
        .engine
        .run(DispatchRequest::new("", TEMPLATE))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Payload(_)));
}

#[tokio::test]
async fn test_missing_gateway_config_is_rejected() {
    let store = store();
    let mut incomplete = config(&[ADMIN], 50);
    incomplete.api_key = None;
    store.set_config(incomplete);
    add_clients(&store, 1);
    let h = harness(store, ScriptedGateway::new());

    let err = h.engine.run(request()).await.unwrap_err();

    assert!(matches!(err, DispatchError::Configuration(_)));
    assert!(h.gateway.sent().is_empty());
    assert_eq!(
        h.store.campaign(CAMPAIGN).unwrap().status,
        CampaignStatus::Pending
    );
}

#[tokio::test]
async fn test_audience_failure_leaves_campaign_untouched() {
    let store = store();
    store.set_config(config(&[ADMIN], 50));
    store.inject(Fault::ClientQueries);
    let h = harness(store, ScriptedGateway::new());

    let err = h.engine.run(request()).await.unwrap_err();

    assert!(matches!(err, DispatchError::AudienceResolution(_)));
    assert!(h.gateway.sent().is_empty());
    let campaign = h.store.campaign(CAMPAIGN).unwrap();
    assert_eq!(campaign.status, CampaignStatus::Pending);
    assert!(campaign.error_message.is_none());
}

#[tokio::test]
async fn test_unreachable_campaign_store_fails_the_run() {
    let store = store();
    store.set_config(config(&[ADMIN], 50));
    add_clients(&store, 3);
    let breaker = store.clone();
    let gateway = ScriptedGateway::new().on_send(move |message, _| {
        if message.phone != ADMIN {
            breaker.inject(Fault::CampaignReads);
        }
    });
    let h = harness(store, gateway);

    let err = h.engine.run(request()).await.unwrap_err();

    assert!(matches!(err, DispatchError::RunFailure(_)));
    h.store.clear(Fault::CampaignReads);
    let campaign = h.store.campaign(CAMPAIGN).unwrap();
    assert_eq!(campaign.status, CampaignStatus::Failed);
    assert!(campaign
        .error_message
        .as_deref()
        .unwrap()
        .contains("injected fault"));
    assert_eq!(campaign.processed_count, 1);
    assert!(h
        .gateway
        .sent_to(ADMIN)
        .iter()
        .any(|text| text.contains("failed")));
}

#[tokio::test]
async fn test_unreachable_ledger_fails_the_run() {
    let store = store();
    add_clients(&store, 2);
    store.inject(Fault::LedgerReads);
    let h = harness(store, ScriptedGateway::new());

    let err = h.engine.run(request()).await.unwrap_err();

    assert!(matches!(err, DispatchError::RunFailure(_)));
    assert!(h.gateway.sent().is_empty());
    assert_eq!(
        h.store.campaign(CAMPAIGN).unwrap().status,
        CampaignStatus::Failed
    );
}

#[tokio::test]
async fn test_log_write_failures_are_absorbed() {
    let store = store();
    add_clients(&store, 3);
    store.inject(Fault::LogAppends);
    let h = harness(store, ScriptedGateway::new());

    let summary = h.engine.run(request()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert!(h.store.logs_for(CAMPAIGN).is_empty());
    assert_eq!(h.store.campaign(CAMPAIGN).unwrap().success_count, 3);
}

#[tokio::test]
async fn test_counter_write_failures_are_absorbed() {
    let store = store();
    add_clients(&store, 3);
    store.inject(Fault::CounterUpdates);
    let h = harness(store, ScriptedGateway::new());

    let summary = h.engine.run(request()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(h.gateway.sent().len(), 3);
    assert_eq!(h.store.logs_for(CAMPAIGN).len(), 3);
    // Final counters ride along with the completion update.
    assert_eq!(h.store.campaign(CAMPAIGN).unwrap().processed_count, 3);
}

#[tokio::test]
async fn test_failed_attempts_retried_when_only_successes_count() {
    let store = store();
    let phones = add_clients(&store, 2);
    store.add_log(CAMPAIGN, &phones[0], DeliveryStatus::Failed);
    store.add_log(CAMPAIGN, &phones[1], DeliveryStatus::Sent);
    let h = harness(store, ScriptedGateway::new());
    let engine = h.engine.clone().with_options(EngineOptions {
        skip_only_successful: true,
        ..Default::default()
    });

    let summary = engine.run(request()).await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(h.gateway.sent_to(&phones[0]).len(), 1);
    assert!(h.gateway.sent_to(&phones[1]).is_empty());
}

#[tokio::test]
async fn test_failed_attempts_skipped_by_default() {
    let store = store();
    let phones = add_clients(&store, 1);
    store.add_log(CAMPAIGN, &phones[0], DeliveryStatus::Failed);
    let h = harness(store, ScriptedGateway::new());

    let summary = h.engine.run(request()).await.unwrap();

    assert_eq!(summary.attempted, 0);
    assert!(h.gateway.sent().is_empty());
}

#[tokio::test]
async fn test_status_check_interval() {
    let store = store();
    add_clients(&store, 6);
    let pauser = store.clone();
    let gateway = ScriptedGateway::new().on_send(move |_, sent| {
        if sent == 1 {
            pauser.set_status(CAMPAIGN, CampaignStatus::Paused);
        }
    });
    let h = harness(store, gateway);
    let engine = h.engine.clone().with_options(EngineOptions {
        status_check_every: NonZeroUsize::new(3).unwrap(),
        ..Default::default()
    });

    let summary = engine.run(request()).await.unwrap();

    // Status is read before attempts 1 and 4 only.
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.outcome, RunOutcome::Stopped(CampaignStatus::Paused));
}

#[tokio::test]
async fn test_shutdown_pauses_the_campaign() {
    let store = store();
    store.set_config(config(&[ADMIN], 50));
    add_clients(&store, 4);
    let token = CancellationToken::new();
    let trigger = token.clone();
    let gateway = ScriptedGateway::new().on_send(move |message, _| {
        if message.phone != ADMIN {
            trigger.cancel();
        }
    });
    let h = harness(store, gateway);
    let engine = h.engine.clone().with_shutdown(token);

    let summary = engine.run(request()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Stopped(CampaignStatus::Paused));
    assert_eq!(summary.attempted, 1);
    assert_eq!(
        h.store.campaign(CAMPAIGN).unwrap().status,
        CampaignStatus::Paused
    );
    assert!(!h
        .gateway
        .sent_to(ADMIN)
        .iter()
        .any(|text| text.contains("completed")));
}

#[tokio::test]
async fn test_request_filters_override_stored_filters() {
    let store = store();
    let mut campaign = pending_campaign(CAMPAIGN, TEMPLATE);
    campaign.audience_filters = Some(r#"{"tagsInclude":["vip"]}"#.to_string());
    store.insert_campaign(campaign);
    store.add_client("c1", "Ana", Some("600000001"), "vip");
    store.add_client("c2", "Bruno", Some("600000002"), "laser");
    store.add_client("c3", "Carla", Some("600000003"), "VIP,laser");
    let h = harness(store, ScriptedGateway::new());

    let stored = h.engine.prepare(request()).await.unwrap();
    assert_eq!(stored.audience_len(), 2);

    let overridden = h
        .engine
        .prepare(request().with_filters(AudienceFilters {
            tags_include: Some(vec!["laser".to_string()]),
        }))
        .await
        .unwrap();
    assert_eq!(overridden.audience_len(), 2);

    let everyone = h
        .engine
        .prepare(request().with_filters(AudienceFilters::default()))
        .await
        .unwrap();
    assert_eq!(everyone.audience_len(), 3);

    // Preparing never changes state.
    assert_eq!(
        h.store.campaign(CAMPAIGN).unwrap().status,
        CampaignStatus::Pending
    );
}

#[tokio::test]
async fn test_unreadable_stored_filters_are_rejected() {
    let store = store();
    let mut campaign = pending_campaign(CAMPAIGN, TEMPLATE);
    campaign.audience_filters = Some("{broken".to_string());
    store.insert_campaign(campaign);
    let h = harness(store, ScriptedGateway::new());

    let err = h.engine.run(request()).await.unwrap_err();
    assert!(matches!(err, DispatchError::Precondition(_)));
}

#[tokio::test]
async fn test_session_name_reaches_the_gateway() {
    let store = store();
    add_clients(&store, 1);
    let h = harness(store, ScriptedGateway::new());

    h.engine
        .run(request().with_session("front-desk"))
        .await
        .unwrap();
    h.store.set_status(CAMPAIGN, CampaignStatus::Paused);
    h.engine.run(request()).await.unwrap();

    assert_eq!(h.connector.sessions(), vec!["front-desk", "default"]);
}

#[tokio::test]
async fn test_clients_without_phone_are_not_messaged() {
    let store = store();
    store.add_client("c1", "Ana", Some("600111222"), "");
    store.add_client("c2", "Bruno", None, "");
    store.add_client("c3", "", Some("600333444"), "");
    let h = harness(store, ScriptedGateway::new());

    let summary = h.engine.run(request()).await.unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(h.gateway.sent_to("600333444"), vec!["Hola "]);
}

#[tokio::test]
async fn test_shared_phone_is_messaged_once() {
    let store = store();
    store.add_client("c1", "Ana", Some("600111222"), "");
    store.add_client("c2", "Luis", Some("600 111 222"), "");
    let h = harness(store, ScriptedGateway::new());

    let summary = h.engine.run(request()).await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(h.gateway.sent().len(), 1);
    assert_eq!(h.store.logs_for(CAMPAIGN).len(), 1);

    h.store.set_status(CAMPAIGN, CampaignStatus::Paused);
    let rerun = h.engine.run(request()).await.unwrap();
    assert_eq!(rerun.attempted, 0);
    assert_eq!(rerun.skipped, 2);
    assert_eq!(h.store.logs_for(CAMPAIGN).len(), 1);
}

#[tokio::test]
async fn test_config_outage_leaves_unstartable_campaign_alone() {
    for status in [CampaignStatus::Completed, CampaignStatus::Running] {
        let store = store();
        store.set_status(CAMPAIGN, status);
        store.inject(Fault::ConfigReads);
        let h = harness(store, ScriptedGateway::new());

        let err = h.engine.run(request()).await.unwrap_err();

        assert!(matches!(err, DispatchError::Precondition(_)));
        let campaign = h.store.campaign(CAMPAIGN).unwrap();
        assert_eq!(campaign.status, status);
        assert!(campaign.error_message.is_none());
    }
}

#[tokio::test]
async fn test_config_outage_fails_startable_campaign() {
    let store = store();
    store.inject(Fault::ConfigReads);
    let h = harness(store, ScriptedGateway::new());

    let err = h.engine.run(request()).await.unwrap_err();

    assert!(matches!(err, DispatchError::RunFailure(_)));
    let campaign = h.store.campaign(CAMPAIGN).unwrap();
    assert_eq!(campaign.status, CampaignStatus::Failed);
    assert!(campaign
        .error_message
        .as_deref()
        .unwrap()
        .contains("ConfigReads"));
}

/// One second per message, a ten second pause after every two.
fn paced_store(recipients: usize) -> Arc<MemoryStore> {
    let store = store();
    store.set_config(DispatchConfig {
        pacing: PacingConfig {
            min_delay_ms: 1_000,
            max_delay_ms: 1_000,
            batch_size_min: 2,
            batch_size_max: 2,
            batch_delay_ms_min: 10_000,
            batch_delay_ms_max: 10_000,
        },
        ..config(&[], 50)
    });
    add_clients(&store, recipients);
    store
}

#[tokio::test(start_paused = true)]
async fn test_message_delays_and_batch_pauses() {
    // (recipients, expected virtual time): no pause follows the last send.
    for (recipients, expected_secs) in [(1, 1), (2, 2), (3, 13), (4, 14), (5, 25)] {
        let h = harness(paced_store(recipients), ScriptedGateway::new());

        let started = Instant::now();
        let summary = h.engine.run(request()).await.unwrap();

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.attempted, recipients as u64);
        assert_eq!(
            started.elapsed(),
            Duration::from_secs(expected_secs),
            "{} recipients",
            recipients
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_message_delay() {
    let h = harness(paced_store(3), ScriptedGateway::new());
    let token = CancellationToken::new();
    let engine = h.engine.clone().with_shutdown(token.clone());

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let summary = engine.run(request()).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(500));
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.outcome, RunOutcome::Stopped(CampaignStatus::Paused));
    assert!(h.gateway.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_batch_pause() {
    let store = paced_store(3);
    // The only recipient after the pause was already contacted.
    store.add_log(CAMPAIGN, "600000003", DeliveryStatus::Sent);
    let h = harness(store, ScriptedGateway::new());
    let token = CancellationToken::new();
    let engine = h.engine.clone().with_shutdown(token.clone());

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let summary = engine.run(request()).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(2_500));
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.outcome, RunOutcome::Stopped(CampaignStatus::Paused));
    let campaign = h.store.campaign(CAMPAIGN).unwrap();
    assert_eq!(campaign.status, CampaignStatus::Paused);
    assert!(campaign.completed_at.is_none());
}
