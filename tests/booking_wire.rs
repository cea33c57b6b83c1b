use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_postgres::{Config, NoTls, SimpleQueryMessage, SimpleQueryRow};
use ulid::Ulid;

use innkeeper::engine::Engine;
use innkeeper::wire;

// ── Test infrastructure ──────────────────────────────────────

async fn start_test_server() -> (SocketAddr, Arc<Engine>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = std::env::temp_dir().join(format!("innkeeper_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let engine = Arc::new(Engine::new(dir.join("innkeeper.wal")).unwrap());

    let served = engine.clone();
    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let engine = served.clone();
            tokio::spawn(async move {
                let _ = wire::process_connection(socket, engine, "innkeeper".to_string(), None).await;
            });
        }
    });

    (addr, engine)
}

async fn connect(addr: SocketAddr) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(addr.ip().to_string())
        .port(addr.port())
        .dbname("test")
        .user("innkeeper")
        .password("innkeeper");

    let (client, connection) = config.connect(NoTls).await.unwrap();
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
}

async fn rows(client: &tokio_postgres::Client, sql: &str) -> Vec<SimpleQueryRow> {
    client
        .simple_query(sql)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|msg| match msg {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .collect()
}

async fn sqlstate(client: &tokio_postgres::Client, sql: &str) -> String {
    let err = client.simple_query(sql).await.unwrap_err();
    err.code().map(|c| c.code().to_string()).unwrap_or_default()
}

async fn seed_room(client: &tokio_postgres::Client, price: &str) -> Ulid {
    let rid = Ulid::new();
    client
        .batch_execute(&format!(
            "INSERT INTO rooms (id, name, price, capacity) VALUES ('{rid}', 'Harbor Suite', '{price}', 2)"
        ))
        .await
        .unwrap();
    rid
}

async fn book(
    client: &tokio_postgres::Client,
    rid: Ulid,
    guest: &str,
    check_in: &str,
    check_out: &str,
) -> SimpleQueryRow {
    let mut found = rows(
        client,
        &format!(
            "INSERT INTO bookings (room_id, guest, check_in, check_out) \
             VALUES ('{rid}', '{guest}', '{check_in}', '{check_out}')"
        ),
    )
    .await;
    assert_eq!(found.len(), 1);
    found.remove(0)
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn room_round_trips_through_catalog() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let rid = seed_room(&client, "120.00").await;
    let found = rows(&client, &format!("SELECT * FROM rooms WHERE id = '{rid}'")).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name"), Some("Harbor Suite"));
    assert_eq!(found[0].get("price"), Some("120.00"));
    assert_eq!(found[0].get("capacity"), Some("2"));
    assert_eq!(found[0].get("security_level"), Some("Standard"));
}

#[tokio::test]
async fn booking_is_priced_by_fractional_days() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;
    let rid = seed_room(&client, "100.00").await;

    let booking = book(&client, rid, "alice", "2031-01-01T14:00:00Z", "2031-01-03T11:00:00Z").await;
    assert_eq!(booking.get("status"), Some("confirmed"));
    assert_eq!(booking.get("total_price"), Some("187.50"));
    assert_eq!(booking.get("check_in"), Some("2031-01-01T14:00:00Z"));
}

#[tokio::test]
async fn overlapping_booking_is_rejected() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;
    let rid = seed_room(&client, "100.00").await;

    book(&client, rid, "alice", "2031-01-01T14:00:00Z", "2031-01-03T11:00:00Z").await;
    let code = sqlstate(
        &client,
        &format!(
            "INSERT INTO bookings (room_id, guest, check_in, check_out) \
             VALUES ('{rid}', 'bob', '2031-01-02T10:00:00Z', '2031-01-04T10:00:00Z')"
        ),
    )
    .await;
    assert_eq!(code, "23P01");

    // back-to-back is fine
    book(&client, rid, "bob", "2031-01-03T11:00:00Z", "2031-01-04T10:00:00Z").await;
}

#[tokio::test]
async fn availability_excludes_booked_rooms() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;
    let busy = seed_room(&client, "100.00").await;
    let free = seed_room(&client, "80.00").await;

    book(&client, busy, "alice", "2031-01-01T14:00:00Z", "2031-01-03T11:00:00Z").await;

    let found = rows(
        &client,
        "SELECT * FROM availability \
         WHERE check_in >= '2031-01-02T00:00:00Z' AND check_out <= '2031-01-02T12:00:00Z'",
    )
    .await;
    let ids: Vec<&str> = found.iter().filter_map(|r| r.get("id")).collect();
    let free = free.to_string();
    let busy = busy.to_string();
    assert!(ids.contains(&free.as_str()));
    assert!(!ids.contains(&busy.as_str()));

    // no window lists every room
    let all = rows(&client, "SELECT * FROM availability").await;
    assert_eq!(all.len(), 2);

    let code = sqlstate(
        &client,
        "SELECT * FROM availability WHERE check_in >= '2031-01-02T00:00:00Z'",
    )
    .await;
    assert_eq!(code, "42601");
}

#[tokio::test]
async fn extension_reprices_the_whole_stay() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;
    let rid = seed_room(&client, "100.00").await;

    let booking = book(&client, rid, "alice", "2031-01-01T14:00:00Z", "2031-01-03T11:00:00Z").await;
    let id = booking.get("id").unwrap().to_string();

    let extended = rows(
        &client,
        &format!(
            "INSERT INTO extensions (booking_id, guest, check_out) \
             VALUES ('{id}', 'alice', '2031-01-03T15:00:00Z')"
        ),
    )
    .await;
    assert_eq!(extended[0].get("check_out"), Some("2031-01-03T15:00:00Z"));
    assert_eq!(extended[0].get("total_price"), Some("204.17"));

    let code = sqlstate(
        &client,
        &format!(
            "INSERT INTO extensions (booking_id, guest, check_out) \
             VALUES ('{id}', 'alice', '2031-01-02T15:00:00Z')"
        ),
    )
    .await;
    assert_eq!(code, "22023");
}

#[tokio::test]
async fn review_requires_checked_in_stay() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;
    let rid = seed_room(&client, "100.00").await;

    let review_sql = format!(
        "INSERT INTO reviews (room_id, guest, text) VALUES ('{rid}', 'alice', 'Lovely view')"
    );
    assert_eq!(sqlstate(&client, &review_sql).await, "42501");

    let booking = book(&client, rid, "alice", "2031-01-01T14:00:00Z", "2031-01-03T11:00:00Z").await;
    let id = booking.get("id").unwrap().to_string();
    let checked_in = rows(
        &client,
        &format!("INSERT INTO check_ins (booking_id) VALUES ('{id}')"),
    )
    .await;
    assert_eq!(checked_in[0].get("status"), Some("checked_in"));

    let review = rows(&client, &review_sql).await;
    assert_eq!(review[0].get("rating"), Some("5"));

    let gate = rows(
        &client,
        &format!("SELECT * FROM checked_in WHERE guest = 'alice' AND room_id = '{rid}'"),
    )
    .await;
    assert_eq!(gate[0].get("checked_in"), Some("t"));
    assert_eq!(gate[0].get("booking_id"), Some(id.as_str()));

    let detail = rows(
        &client,
        &format!("SELECT * FROM room_detail WHERE room_id = '{rid}' AND guest = 'alice'"),
    )
    .await;
    let reviews: serde_json::Value = serde_json::from_str(detail[0].get("reviews").unwrap()).unwrap();
    assert_eq!(reviews.as_array().unwrap().len(), 1);
    let existing: serde_json::Value =
        serde_json::from_str(detail[0].get("existing_booking").unwrap()).unwrap();
    assert_eq!(existing["id"], id.as_str());
}

#[tokio::test]
async fn guest_without_stay_is_not_checked_in() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let gate = rows(&client, "SELECT * FROM checked_in WHERE guest = 'nobody'").await;
    assert_eq!(gate.len(), 1);
    assert_eq!(gate[0].get("checked_in"), Some("f"));
    assert_eq!(gate[0].get("room_id"), None);
}

#[tokio::test]
async fn unknown_inputs_map_to_sqlstates() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;
    let rid = seed_room(&client, "100.00").await;

    let missing = Ulid::new();
    assert_eq!(
        sqlstate(&client, &format!("SELECT * FROM reviews WHERE room_id = '{missing}'")).await,
        "P0002"
    );
    assert_eq!(
        sqlstate(
            &client,
            &format!(
                "INSERT INTO bookings (room_id, guest, check_in, check_out) \
                 VALUES ('{rid}', 'alice', 'next tuesday', '2031-01-03T11:00:00Z')"
            ),
        )
        .await,
        "22007"
    );
    assert_eq!(
        sqlstate(
            &client,
            &format!(
                "INSERT INTO rooms (id, name, price, capacity) VALUES ('{rid}', 'Again', '1.00', 1)"
            ),
        )
        .await,
        "23505"
    );
    assert_eq!(sqlstate(&client, "SELECT * FROM guests").await, "42601");
}

#[tokio::test]
async fn extended_protocol_binds_parameters() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;
    let rid = seed_room(&client, "100.00").await;
    let rid = rid.to_string();

    let found = client
        .query(
            "INSERT INTO bookings (room_id, guest, check_in, check_out) VALUES ($1, $2, $3, $4)",
            &[&rid, &"alice", &"2031-01-01T14:00:00Z", &"2031-01-03T11:00:00Z"],
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    let price: String = found[0].get("total_price");
    assert_eq!(price, "187.50");

    let bookings = client
        .query("SELECT * FROM bookings WHERE guest = $1", &[&"alice"])
        .await
        .unwrap();
    assert_eq!(bookings.len(), 1);
    let room: String = bookings[0].get("room_id");
    assert_eq!(room, rid);
}
