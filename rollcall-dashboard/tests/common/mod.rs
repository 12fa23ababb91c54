//! Shared helpers: in-process mock backend and a recording notifier

#![allow(dead_code)]

use axum::Router;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rollcall_common::config::{DashboardConfig, ReloadPolicy};
use rollcall_common::token::{MemoryTokenStore, TokenStore};
use rollcall_dashboard::{AlertLevel, Dashboard, Notifier};

pub const TOKEN: &str = "test-token";

/// Serve `app` on an ephemeral port and return its base URL
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind ephemeral port");
    let addr = listener.local_addr().expect("Should have local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock backend failed");
    });
    format!("http://{}", addr)
}

/// Captured request bodies, in arrival order
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<Value>>>);

impl Captured {
    pub fn push(&self, value: Value) {
        self.0.lock().unwrap().push(value);
    }

    pub fn all(&self) -> Vec<Value> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Notifier that records everything and answers confirmations with a fixed reply
pub struct RecordingNotifier {
    alerts: Mutex<Vec<(AlertLevel, String)>>,
    prompts: Mutex<Vec<String>>,
    redirects: AtomicUsize,
    answer: bool,
}

impl RecordingNotifier {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            alerts: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            redirects: AtomicUsize::new(0),
            answer,
        })
    }

    pub fn alerts(&self) -> Vec<(AlertLevel, String)> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn alerts_at(&self, level: AlertLevel) -> Vec<String> {
        self.alerts()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, level: AlertLevel, message: &str) {
        self.alerts.lock().unwrap().push((level, message.to_string()));
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer
    }

    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub dashboard: Dashboard,
    pub notifier: Arc<RecordingNotifier>,
    pub tokens: Arc<MemoryTokenStore>,
}

/// Dashboard pointed at `base_url`, logged in, answering confirmations with `answer`
pub fn harness(base_url: &str, policy: ReloadPolicy, answer: bool) -> Harness {
    let config = DashboardConfig {
        server_url: base_url.to_string(),
        reload_policy: policy,
        request_timeout_secs: 5,
        ..Default::default()
    };
    let notifier = RecordingNotifier::new(answer);
    let tokens = Arc::new(MemoryTokenStore::with_token(TOKEN));

    let dashboard = Dashboard::from_config(
        &config,
        tokens.clone() as Arc<dyn TokenStore>,
        notifier.clone() as Arc<dyn Notifier>,
    )
    .expect("Should build dashboard");

    Harness {
        dashboard,
        notifier,
        tokens,
    }
}

pub fn student_json(id: i64, name: &str, roll: &str, class: &str, section: &str) -> Value {
    json!({
        "student_id": id,
        "roll_number": roll,
        "name": name,
        "class_name": class,
        "section": section,
        "branch": null,
        "email": null,
        "photo_url": null,
        "is_active": true
    })
}

/// Alice and Bob in 10 - A, Cara in 11 - B
pub fn sample_roster() -> Value {
    json!([
        student_json(1, "Alice", "CS001", "10", "A"),
        student_json(2, "Bob", "CS002", "10", "A"),
        student_json(3, "Cara", "CS003", "11", "B"),
    ])
}

pub fn sample_classes() -> Value {
    json!([
        {"class_id": 7, "class_name": "10", "section": "A", "subject": "Maths"},
        {"class_id": 8, "class_name": "11", "section": "B", "subject": "Physics"}
    ])
}

pub fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}
