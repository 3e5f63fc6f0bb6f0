use async_trait::async_trait;
use chrono::NaiveDate;
use client_status_dashboard::access::Credentials;
use client_status_dashboard::clickup::TaskSource;
use client_status_dashboard::config::AppConfig;
use client_status_dashboard::db::Database;
use client_status_dashboard::errors::{AppError, AppResult};
use client_status_dashboard::models::{StepStatus, Track, UpdateDateRequest, WebhookOutcome};
use client_status_dashboard::service::DashboardService;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const KICKOFF_MS: &str = "1736164800000"; // 2025-01-06 12:00 UTC
const ADMIN_KEY: &str = "admin-key";

#[derive(Default)]
struct FakeClickUp {
    tasks: Mutex<BTreeMap<String, Value>>,
    comments: Mutex<BTreeMap<String, String>>,
    writes: Mutex<Vec<(String, String, Option<i64>)>>,
    offline: AtomicBool,
}

impl FakeClickUp {
    fn add_task(&self, task: Value) {
        let id = task["id"].as_str().expect("task id").to_string();
        self.tasks.lock().expect("tasks").insert(id, task);
    }

    fn add_comment(&self, task_id: &str, text: &str) {
        self.comments
            .lock()
            .expect("comments")
            .insert(task_id.to_string(), text.to_string());
    }

    fn check_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("clickup unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskSource for FakeClickUp {
    async fn fetch_tasks_for_list(&self, _list_id: &str) -> AppResult<Vec<Value>> {
        self.check_online()?;
        Ok(self.tasks.lock().expect("tasks").values().cloned().collect())
    }

    async fn fetch_task(&self, task_id: &str) -> AppResult<Value> {
        self.check_online()?;
        self.tasks
            .lock()
            .expect("tasks")
            .get(task_id)
            .cloned()
            .ok_or_else(|| AppError::Upstream(format!("unknown task {task_id}")))
    }

    async fn fetch_latest_comment(&self, task_id: &str) -> AppResult<String> {
        self.check_online()?;
        Ok(self
            .comments
            .lock()
            .expect("comments")
            .get(task_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_custom_field_value(&self, task_id: &str, field_id: &str, value: Option<i64>) -> AppResult<()> {
        self.check_online()?;
        self.writes
            .lock()
            .expect("writes")
            .push((task_id.to_string(), field_id.to_string(), value));

        let mut tasks = self.tasks.lock().expect("tasks");
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| AppError::Upstream(format!("unknown task {task_id}")))?;
        let stored = value.map(|ms| json!(ms.to_string())).unwrap_or(Value::Null);
        let fields = task["custom_fields"].as_array_mut().expect("custom fields");
        match fields.iter_mut().find(|field| field["id"] == field_id) {
            Some(field) => field["value"] = stored,
            None => fields.push(json!({ "id": field_id, "type": "date", "value": stored })),
        }
        Ok(())
    }
}

fn task(id: &str, sf_id: &str, status_type: &str, updated_ms: &str) -> Value {
    json!({
        "id": id,
        "name": "Acme Clinic",
        "url": format!("https://app.clickup.com/t/{id}"),
        "status": { "status": "in progress", "type": status_type },
        "date_created": "1735689600000",
        "date_updated": updated_ms,
        "custom_fields": [
            { "id": "sf", "type": "short_text", "value": sf_id },
            { "id": "f-kickoff", "type": "date", "value": KICKOFF_MS },
            { "id": "f-location", "type": "short_text", "value": "Remote" },
            { "id": "f-sra-on", "type": "checkbox", "value": true }
        ]
    })
}

fn config(db_path: &Path) -> AppConfig {
    let env = BTreeMap::from([
        ("CLICKUP_API_TOKEN", "pk_test".to_string()),
        ("CLICKUP_LIST_ID", "list-1".to_string()),
        ("CLICKUP_SF_ID_FIELD_ID", "sf".to_string()),
        ("CLIENT_LINK_SECRET", "link-secret".to_string()),
        ("ADMIN_API_KEY", ADMIN_KEY.to_string()),
        ("WEBHOOK_TOKEN", "hook".to_string()),
        ("DATABASE_PATH", db_path.display().to_string()),
        (
            "CLICKUP_FIELD_MAP_JSON",
            json!({
                "sra.sra_kickoff.date": "f-kickoff",
                "sra.review_sra.date": "f-review",
                "project.remote_onsite": "f-location",
                "project.sra_enabled": "f-sra-on"
            })
            .to_string(),
        ),
    ]);
    AppConfig::from_lookup(|name| env.get(name).cloned()).expect("config")
}

struct Harness {
    _dir: tempfile::TempDir,
    clickup: Arc<FakeClickUp>,
    service: DashboardService,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(&dir.path().join("status.db"));
    let db = Arc::new(Database::new(&config.database_path).expect("db"));
    let clickup = Arc::new(FakeClickUp::default());
    let service = DashboardService::new(config, db, clickup.clone());
    Harness {
        _dir: dir,
        clickup,
        service,
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 8).expect("valid date")
}

async fn synced_harness() -> (Harness, String) {
    let harness = harness();
    harness.clickup.add_task(task("t-1", "001ACME", "custom", "1736200000000"));
    harness.clickup.add_comment("t-1", "Waiting on BAA");
    harness.service.manual_sync(ADMIN_KEY).await.expect("sync");
    let signature = harness.service.access().sign("001ACME").expect("sign");
    (harness, signature)
}

#[tokio::test]
async fn sync_keeps_one_row_per_client() {
    let harness = harness();
    harness.clickup.add_task(task("t-open", "001ACME", "custom", "1736200000000"));
    harness.clickup.add_task(task("t-closed", "001ACME", "closed", "1736900000000"));
    harness.clickup.add_task(task("t-orphan", "", "custom", "1736900000000"));
    harness.clickup.add_comment("t-open", "Kickoff done");

    assert!(harness.service.manual_sync("wrong").await.is_err());
    let synced = harness.service.manual_sync(ADMIN_KEY).await.expect("sync");
    assert_eq!(synced, 1);

    let stored = harness
        .service
        .database()
        .get_client_status("001ACME")
        .expect("query")
        .expect("row");
    assert_eq!(stored.task_id, "t-open");
    assert_eq!(stored.metrics.text("project.next_steps"), "Kickoff done");
    assert_eq!(stored.metrics.text("sra.sra_kickoff.date"), "01/06/2025");
}

#[tokio::test]
async fn dashboard_requires_valid_signature() {
    let (harness, signature) = synced_harness().await;

    let forbidden = harness
        .service
        .client_dashboard("001ACME", &Credentials::client("deadbeef"), today())
        .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    let other_signature = harness.service.access().sign("999NONE").expect("sign");
    let missing = harness
        .service
        .client_dashboard("999NONE", &Credentials::client(&other_signature), today())
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let view = harness
        .service
        .client_dashboard("001ACME", &Credentials::client(&signature), today())
        .await
        .expect("dashboard");
    assert!(!view.can_edit);
    assert!(!view.can_admin_nav);
    assert!(view.dashboard.show_sra);
    assert!(!view.dashboard.show_nva);
    assert_eq!(view.dashboard.project_details.next_steps, "Waiting on BAA");
    assert_eq!(view.dashboard.project_details.location.as_deref(), Some("Remote"));
    let kickoff = view.dashboard.step(Track::Sra, "sra_kickoff").expect("kickoff");
    assert_eq!(kickoff.status, StepStatus::Completed);
    let receive = view
        .dashboard
        .step(Track::Sra, "receive_policies_and_procedures_baa")
        .expect("receive");
    assert_eq!(receive.ecd.value, "01/13/2025");
    assert!(!receive.ecd.editable);
}

#[tokio::test]
async fn dashboard_serves_cache_when_clickup_is_down() {
    let (harness, signature) = synced_harness().await;
    harness.clickup.offline.store(true, Ordering::SeqCst);

    let view = harness
        .service
        .client_dashboard("001ACME", &Credentials::admin(&signature, ADMIN_KEY), today())
        .await
        .expect("cached dashboard");
    assert!(view.can_edit);
    assert!(view.can_admin_nav);
    assert_eq!(view.status.task_id, "t-1");

    let portfolio = harness.service.portfolio(ADMIN_KEY, true).await.expect("portfolio");
    assert_eq!(portfolio.count, 1);
}

#[tokio::test]
async fn override_edits_are_stored_and_logged() {
    let (harness, signature) = synced_harness().await;
    let admin = Credentials::admin(&signature, ADMIN_KEY);
    let request = UpdateDateRequest {
        override_key: "override:review_sra.ecd".to_string(),
        value: "2025-03-03".to_string(),
        ..UpdateDateRequest::default()
    };

    let denied = harness
        .service
        .update_date("001ACME", &Credentials::client(&signature), &request)
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    harness
        .service
        .update_date("001ACME", &admin, &request)
        .await
        .expect("override");
    let view = harness
        .service
        .client_dashboard("001ACME", &admin, today())
        .await
        .expect("dashboard");
    let review = view.dashboard.step(Track::Sra, "review_sra").expect("review");
    assert_eq!(review.ecd.value, "03/03/2025");
    assert!(review.ecd.editable);

    let clear = UpdateDateRequest {
        value: String::new(),
        ..request.clone()
    };
    harness.service.update_date("001ACME", &admin, &clear).await.expect("clear");
    assert!(harness
        .service
        .database()
        .get_ecd_overrides("001ACME")
        .expect("overrides")
        .is_empty());

    let log = harness.service.database().list_edit_log("001ACME").expect("log");
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].field_key, "override:review_sra.ecd");
    assert_eq!(log[0].old_value.as_deref(), Some(""));
    assert_eq!(log[0].new_value.as_deref(), Some("03/03/2025"));
    assert_eq!(log[1].old_value.as_deref(), Some("03/03/2025"));
    assert_eq!(log[1].new_value.as_deref(), Some(""));
    assert_eq!(log[1].source, "admin_update_override");
}

#[tokio::test]
async fn invalid_edits_are_rejected() {
    let (harness, signature) = synced_harness().await;
    let admin = Credentials::admin(&signature, ADMIN_KEY);

    let empty = harness
        .service
        .update_date("001ACME", &admin, &UpdateDateRequest::default())
        .await;
    assert!(matches!(empty, Err(AppError::Invalid(_))));

    let bad_date = UpdateDateRequest {
        override_key: "override:review_sra.ecd".to_string(),
        value: "03/03/2025".to_string(),
        ..UpdateDateRequest::default()
    };
    assert!(matches!(
        harness.service.update_date("001ACME", &admin, &bad_date).await,
        Err(AppError::Invalid(_))
    ));

    let unmapped = UpdateDateRequest {
        metric_key: "sra.unknown.date".to_string(),
        value: "2025-03-03".to_string(),
        ..UpdateDateRequest::default()
    };
    assert!(matches!(
        harness.service.update_date("001ACME", &admin, &unmapped).await,
        Err(AppError::Invalid(_))
    ));
    assert!(harness.service.database().list_edit_log("001ACME").expect("log").is_empty());
}

#[tokio::test]
async fn mapped_metric_edits_write_to_clickup() {
    let (harness, signature) = synced_harness().await;
    let admin = Credentials::admin(&signature, ADMIN_KEY);
    let request = UpdateDateRequest {
        metric_key: "sra.review_sra.date".to_string(),
        value: "2025-02-14".to_string(),
        ..UpdateDateRequest::default()
    };

    harness
        .service
        .update_date("001ACME", &admin, &request)
        .await
        .expect("clickup edit");

    let writes = harness.clickup.writes.lock().expect("writes").clone();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "t-1");
    assert_eq!(writes[0].1, "f-review");
    assert_eq!(writes[0].2, Some(1_739_534_400_000));

    let stored = harness
        .service
        .database()
        .get_client_status("001ACME")
        .expect("query")
        .expect("row");
    assert_eq!(stored.metrics.text("sra.review_sra.date"), "02/14/2025");
    assert_eq!(stored.metrics.text("project.next_steps"), "Waiting on BAA");

    let log = harness.service.database().list_edit_log("001ACME").expect("log");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].source, "admin_update_clickup");
    assert_eq!(log[0].task_id.as_deref(), Some("t-1"));
    assert_eq!(log[0].new_value.as_deref(), Some("02/14/2025"));
}

#[tokio::test]
async fn webhook_refreshes_single_task() {
    let harness = harness();
    harness.clickup.add_task(task("t-9", "009ZED", "custom", "1736200000000"));
    harness.clickup.add_task(task("t-no-sf", "", "custom", "1736200000000"));

    assert!(matches!(
        harness.service.handle_webhook("nope", &json!({ "task_id": "t-9" })).await,
        Err(AppError::Forbidden(_))
    ));
    assert_eq!(
        harness.service.handle_webhook("hook", &json!({ "event": "ping" })).await.expect("ignored"),
        WebhookOutcome::Ignored {
            reason: "missing_task_id".to_string()
        }
    );
    assert_eq!(
        harness
            .service
            .handle_webhook("hook", &json!({ "task_id": "t-no-sf" }))
            .await
            .expect("ignored"),
        WebhookOutcome::Ignored {
            reason: "missing_sf_id".to_string()
        }
    );
    assert_eq!(
        harness
            .service
            .handle_webhook("hook", &json!({ "task": { "id": "t-9" } }))
            .await
            .expect("updated"),
        WebhookOutcome::Updated {
            sf_id: "009ZED".to_string()
        }
    );
    assert!(harness
        .service
        .database()
        .get_client_status("009ZED")
        .expect("query")
        .is_some());
}

#[tokio::test]
async fn signed_links_and_portfolio_need_admin_key() {
    let (harness, signature) = synced_harness().await;

    assert!(harness.service.signed_link("", "001ACME").is_err());
    let link = harness.service.signed_link(ADMIN_KEY, "001ACME").expect("link");
    assert_eq!(link.signature, signature);
    assert_eq!(link.url_path, format!("/status/001ACME?sig={signature}"));

    assert!(matches!(
        harness.service.portfolio("", false).await,
        Err(AppError::Forbidden(_))
    ));
    let portfolio = harness.service.portfolio(ADMIN_KEY, false).await.expect("portfolio");
    assert_eq!(portfolio.active_count, 1);
    assert_eq!(portfolio.active_groups[0].period_label, "2025 Q1");
    assert_eq!(portfolio.active_groups[0].projects[0].task_status, "In Progress");
}
