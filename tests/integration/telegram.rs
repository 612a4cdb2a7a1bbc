use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use lay_arb::feeds::MockFetcher;
use lay_arb::notify::{BotInfo, CommandHandler, CommandPoller, SubscriberStore, TelegramApi, TelegramNotifier};
use lay_arb::scan::{CycleOutcome, Scanner, ScannerSettings};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use time::UtcOffset;

use crate::common::{back, lay, COMPARATOR, REFERENCE, T0};

#[derive(Clone, Default)]
struct Bot {
    updates: Arc<Mutex<Vec<Value>>>,
    sent: Arc<Mutex<Vec<(i64, String)>>>,
}

async fn bot_method(
    State(bot): State<Bot>,
    Path((_token, method)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    match method.as_str() {
        "getUpdates" => {
            let pending = std::mem::take(&mut *bot.updates.lock().unwrap());
            Json(json!({ "ok": true, "result": pending }))
        }
        _ => {
            let chat_id = body["chat_id"].as_i64().unwrap();
            let text = body["text"].as_str().unwrap().to_string();
            bot.sent.lock().unwrap().push((chat_id, text));
            Json(json!({ "ok": true, "result": {} }))
        }
    }
}

async fn serve_bot() -> (TelegramApi, Bot) {
    let bot = Bot::default();
    let app = Router::new()
        .route("/:token/:method", post(bot_method))
        .with_state(bot.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (TelegramApi::with_base_url(&format!("http://{}", addr), "123:abc"), bot)
}

fn message(update_id: i64, chat_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": { "chat": { "id": chat_id }, "from": { "first_name": "Sam" }, "text": text }
    })
}

#[tokio::test]
async fn subscribed_chats_receive_cycle_alerts() {
    let (api, bot) = serve_bot().await;
    let subscribers = Arc::new(SubscriberStore::in_memory());
    let handler = CommandHandler::new(subscribers.clone(), BotInfo::default(), UtcOffset::UTC);
    let mut poller = CommandPoller::new(api.clone(), handler);

    bot.updates.lock().unwrap().extend([
        message(1, 100, "/start"),
        message(2, 200, "/start"),
        message(3, 300, "/start"),
        message(4, 300, "/stop"),
    ]);
    assert_eq!(poller.poll_once(0).await.unwrap(), 4);
    bot.sent.lock().unwrap().clear();

    let scanner = Scanner::new(
        Arc::new(MockFetcher::new(REFERENCE, vec![lay("Arsenal", "2.00")])),
        Arc::new(MockFetcher::new(COMPARATOR, vec![back("Arsenal", "2.20")])),
        Arc::new(TelegramNotifier::new(api, subscribers.clone(), UtcOffset::UTC)),
        ScannerSettings::default(),
    );

    let report = scanner.run_cycle(T0).await;

    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.alerts_sent, 1);
    assert_eq!(report.notify_failures, 0);
    let sent = bot.sent.lock().unwrap().clone();
    let chats: Vec<_> = sent.iter().map(|(chat, _)| *chat).collect();
    assert_eq!(chats, vec![100, 200]);
    assert!(sent.iter().all(|(_, text)| text.contains("Diff: +0.20 (+10.00%)")));
    assert_eq!(subscribers.get(100).await.unwrap().notifications, 1);
    assert!(subscribers.get(300).await.is_none());
}
