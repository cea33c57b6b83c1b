use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::Sink;
use futures::stream;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{AuthSource, DefaultServerParameterProvider, LoginInfo, Password, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use serde_json::json;
use tokio::net::TcpStream;

use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::observability::{QUERIES_TOTAL, QUERY_DURATION_SECONDS, command_label};
use crate::sql::{self, Command, SqlError};
use crate::timefmt::format_timestamp;

pub struct InnkeeperHandler {
    engine: Arc<Engine>,
    query_parser: Arc<InnkeeperQueryParser>,
}

impl InnkeeperHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            query_parser: Arc::new(InnkeeperQueryParser),
        }
    }

    /// Execute with per-command query metrics.
    async fn run(&self, cmd: Command) -> PgWireResult<Response> {
        let label = command_label(&cmd);
        let started = Instant::now();
        let result = self.execute_command(cmd).await;
        metrics::histogram!(QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(QUERIES_TOTAL, "command" => label, "status" => status).increment(1);
        result
    }

    async fn execute_command(&self, cmd: Command) -> PgWireResult<Response> {
        let engine = &self.engine;
        match cmd {
            Command::InsertRoom { id, spec } => {
                engine.create_room(id, spec).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
            }
            Command::InsertBooking(req) => {
                let booking = engine.create_booking(req).await.map_err(engine_err)?;
                booking_response(vec![booking])
            }
            Command::ExtendBooking {
                booking_id,
                guest,
                check_out,
            } => {
                let booking = engine
                    .extend_booking(booking_id, &guest, check_out)
                    .await
                    .map_err(engine_err)?;
                booking_response(vec![booking])
            }
            Command::CheckIn { booking_id } => {
                let booking = engine.check_in(booking_id).await.map_err(engine_err)?;
                booking_response(vec![booking])
            }
            Command::CheckOut { booking_id } => {
                let booking = engine.check_out(booking_id).await.map_err(engine_err)?;
                booking_response(vec![booking])
            }
            Command::RateStay {
                booking_id,
                guest,
                rating,
                review,
            } => {
                let booking = engine
                    .rate_stay(booking_id, &guest, rating, review)
                    .await
                    .map_err(engine_err)?;
                booking_response(vec![booking])
            }
            Command::InsertReview(req) => {
                let review = engine.submit_review(req).await.map_err(engine_err)?;
                review_response(vec![review])
            }
            Command::SelectAvailability {
                check_in,
                check_out,
            } => {
                let window = match (check_in, check_out) {
                    (Some(check_in), Some(check_out)) => Some(
                        Span::try_new(check_in, check_out)
                            .ok_or(EngineError::InvalidRange {
                                check_in,
                                check_out,
                            })
                            .map_err(engine_err)?,
                    ),
                    _ => None,
                };
                let rooms = engine
                    .search_availability(window)
                    .await
                    .map_err(engine_err)?;
                room_response(rooms)
            }
            Command::SelectRooms { id } => {
                let rooms = match id {
                    Some(id) => vec![engine.get_room_info(id).await.map_err(engine_err)?],
                    None => engine.list_rooms().await,
                };
                room_response(rooms)
            }
            Command::SelectBookings { room_id, guest } => {
                let bookings = engine
                    .get_bookings(room_id, guest.as_deref())
                    .await
                    .map_err(engine_err)?;
                booking_response(bookings)
            }
            Command::SelectReviews { room_id } => {
                let reviews = engine.get_reviews(room_id).await.map_err(engine_err)?;
                review_response(reviews)
            }
            Command::SelectRoomDetail { room_id, guest } => {
                let detail = engine
                    .room_detail(room_id, &guest)
                    .await
                    .map_err(engine_err)?;
                room_detail_response(&detail)
            }
            Command::SelectCheckedIn { guest, room_id } => {
                let (room_id, checked_in, stay) = match room_id {
                    Some(rid) => {
                        let checked_in = engine.is_checked_in(rid, &guest).await.map_err(engine_err)?;
                        let stay = if checked_in {
                            engine
                                .get_bookings(Some(rid), Some(&guest))
                                .await
                                .map_err(engine_err)?
                                .into_iter()
                                .filter(|b| b.status == BookingStatus::CheckedIn)
                                .max_by_key(|b| b.span.start)
                        } else {
                            None
                        };
                        (Some(rid), checked_in, stay)
                    }
                    None => {
                        let stay = engine.current_stay(&guest).await;
                        (stay.as_ref().map(|b| b.room_id), stay.is_some(), stay)
                    }
                };

                let schema = Arc::new(checked_in_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&room_id.map(|r| r.to_string()))?;
                encoder.encode_field(&guest)?;
                encoder.encode_field(&checked_in)?;
                encoder.encode_field(&stay.map(|b| b.id.to_string()))?;
                let rows = vec![Ok(encoder.take_row())];
                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }
        }
    }
}

// ── Result schemas ───────────────────────────────────────────────

fn text_field(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::VARCHAR, FieldFormat::Text)
}

fn int_field(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::INT8, FieldFormat::Text)
}

fn room_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id"),
        text_field("name"),
        text_field("description"),
        text_field("price"),
        int_field("capacity"),
        text_field("amenities"),
        int_field("bedrooms"),
        int_field("bathrooms"),
        int_field("size_sqft"),
        text_field("security_level"),
    ]
}

fn booking_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id"),
        text_field("room_id"),
        text_field("guest"),
        text_field("check_in"),
        text_field("check_out"),
        text_field("status"),
        text_field("special_requests"),
        int_field("guest_count"),
        text_field("total_price"),
        int_field("rating"),
        text_field("review"),
    ]
}

fn review_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id"),
        text_field("room_id"),
        text_field("guest"),
        text_field("text"),
        int_field("rating"),
        text_field("created_at"),
    ]
}

fn room_detail_schema() -> Vec<FieldInfo> {
    let mut schema = room_schema();
    schema.push(FieldInfo::new("reviews".into(), None, None, Type::JSON, FieldFormat::Text));
    schema.push(FieldInfo::new(
        "existing_booking".into(),
        None,
        None,
        Type::JSON,
        FieldFormat::Text,
    ));
    schema
}

fn checked_in_schema() -> Vec<FieldInfo> {
    vec![
        text_field("room_id"),
        text_field("guest"),
        FieldInfo::new("checked_in".into(), None, None, Type::BOOL, FieldFormat::Text),
        text_field("booking_id"),
    ]
}

/// Result columns for a statement, chosen by the table it targets.
fn schema_for(sql: &str) -> Vec<FieldInfo> {
    match sql::target_table(sql).as_deref() {
        Some("availability" | "rooms") if is_select(sql) => room_schema(),
        Some("bookings" | "extensions" | "check_ins" | "check_outs" | "ratings") => booking_schema(),
        Some("reviews") => review_schema(),
        Some("room_detail") => room_detail_schema(),
        Some("checked_in") => checked_in_schema(),
        _ => vec![],
    }
}

fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
}

// ── Row encoding ─────────────────────────────────────────────────

fn encode_room(encoder: &mut DataRowEncoder, room: &RoomInfo) -> PgWireResult<()> {
    let spec = &room.spec;
    encoder.encode_field(&room.id.to_string())?;
    encoder.encode_field(&spec.name)?;
    encoder.encode_field(&spec.description)?;
    encoder.encode_field(&spec.price.to_string())?;
    encoder.encode_field(&i64::from(spec.capacity))?;
    encoder.encode_field(&spec.amenities)?;
    encoder.encode_field(&i64::from(spec.bedrooms))?;
    encoder.encode_field(&i64::from(spec.bathrooms))?;
    encoder.encode_field(&i64::from(spec.size_sqft))?;
    encoder.encode_field(&spec.security_level)?;
    Ok(())
}

fn room_response(rooms: Vec<RoomInfo>) -> PgWireResult<Response> {
    let schema = Arc::new(room_schema());
    let mut rows = Vec::with_capacity(rooms.len());
    for room in &rooms {
        let mut encoder = DataRowEncoder::new(schema.clone());
        encode_room(&mut encoder, room)?;
        rows.push(Ok(encoder.take_row()));
    }
    Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
}

fn booking_response(bookings: Vec<Booking>) -> PgWireResult<Response> {
    let schema = Arc::new(booking_schema());
    let mut rows = Vec::with_capacity(bookings.len());
    for b in &bookings {
        let mut encoder = DataRowEncoder::new(schema.clone());
        encoder.encode_field(&b.id.to_string())?;
        encoder.encode_field(&b.room_id.to_string())?;
        encoder.encode_field(&b.guest)?;
        encoder.encode_field(&format_timestamp(b.span.start))?;
        encoder.encode_field(&format_timestamp(b.span.end))?;
        encoder.encode_field(&b.status.to_string())?;
        encoder.encode_field(&b.special_requests)?;
        encoder.encode_field(&b.guest_count.map(i64::from))?;
        encoder.encode_field(&b.total_price.to_string())?;
        encoder.encode_field(&b.rating.map(i64::from))?;
        encoder.encode_field(&b.review)?;
        rows.push(Ok(encoder.take_row()));
    }
    Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
}

fn review_response(reviews: Vec<Review>) -> PgWireResult<Response> {
    let schema = Arc::new(review_schema());
    let mut rows = Vec::with_capacity(reviews.len());
    for r in &reviews {
        let mut encoder = DataRowEncoder::new(schema.clone());
        encoder.encode_field(&r.id.to_string())?;
        encoder.encode_field(&r.room_id.to_string())?;
        encoder.encode_field(&r.guest)?;
        encoder.encode_field(&r.text)?;
        encoder.encode_field(&i64::from(r.rating))?;
        encoder.encode_field(&format_timestamp(r.created_at))?;
        rows.push(Ok(encoder.take_row()));
    }
    Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
}

fn booking_json(b: &Booking) -> serde_json::Value {
    json!({
        "id": b.id.to_string(),
        "room_id": b.room_id.to_string(),
        "guest": b.guest,
        "check_in": format_timestamp(b.span.start),
        "check_out": format_timestamp(b.span.end),
        "status": b.status.as_str(),
        "special_requests": b.special_requests,
        "guest_count": b.guest_count,
        "total_price": b.total_price.to_string(),
        "rating": b.rating,
        "review": b.review,
    })
}

fn review_json(r: &Review) -> serde_json::Value {
    json!({
        "id": r.id.to_string(),
        "guest": r.guest,
        "text": r.text,
        "rating": r.rating,
        "created_at": format_timestamp(r.created_at),
    })
}

fn room_detail_response(detail: &RoomDetail) -> PgWireResult<Response> {
    let schema = Arc::new(room_detail_schema());
    let reviews = serde_json::Value::Array(detail.reviews.iter().map(review_json).collect());

    let mut encoder = DataRowEncoder::new(schema.clone());
    encode_room(&mut encoder, &detail.room)?;
    encoder.encode_field(&reviews.to_string())?;
    encoder.encode_field(&detail.existing_booking.as_ref().map(|b| booking_json(b).to_string()))?;
    let rows = vec![Ok(encoder.take_row())];
    Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
}

#[async_trait]
impl SimpleQueryHandler for InnkeeperHandler {
    async fn do_query<C>(
        &self,
        _client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        Ok(vec![self.run(cmd).await?])
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct InnkeeperQueryParser;

#[async_trait]
impl QueryParser for InnkeeperQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(schema_for(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for InnkeeperHandler {
    type Statement = String;
    type QueryParser = InnkeeperQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        _client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(portal);
        let cmd = sql::parse_sql(&sql).map_err(sql_err)?;
        self.run(cmd).await
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            schema_for(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(schema_for(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start
                && let Ok(n) = sql[start..i].parse::<usize>()
            {
                max = max.max(n);
            }
        } else {
            i += 1;
        }
    }
    max
}

fn substitute_params(portal: &Portal<String>) -> String {
    bind_params(&portal.statement.statement, &portal.parameters[..])
}

/// Replace `$1`, `$2`, ... with bound values (text format) in one left-to-right
/// pass. Bound values are never rescanned, and `$n` inside a quoted literal or
/// past the last parameter is left as is.
fn bind_params<B: AsRef<[u8]>>(sql: &str, params: &[Option<B>]) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                in_literal = !in_literal;
                i += 1;
            }
            b'$' if !in_literal => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                let param = sql[start..end]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|idx| params.get(idx));
                match param {
                    Some(value) => {
                        out.push_str(&sql[copied..i]);
                        match value {
                            Some(raw) => {
                                let text = String::from_utf8_lossy(raw.as_ref());
                                out.push('\'');
                                out.push_str(&text.replace('\'', "''"));
                                out.push('\'');
                            }
                            None => out.push_str("NULL"),
                        }
                        copied = end;
                        i = end;
                    }
                    None => i = end,
                }
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[copied..]);
    out
}

// ── Auth + factory ───────────────────────────────────────────────

/// Single shared password for every login.
#[derive(Debug)]
pub struct InnkeeperAuthSource {
    password: String,
}

#[async_trait]
impl AuthSource for InnkeeperAuthSource {
    async fn get_password(&self, _login: &LoginInfo) -> PgWireResult<Password> {
        Ok(Password::new(None, self.password.as_bytes().to_vec()))
    }
}

pub struct InnkeeperFactory {
    handler: Arc<InnkeeperHandler>,
    auth_handler: Arc<
        CleartextPasswordAuthStartupHandler<InnkeeperAuthSource, DefaultServerParameterProvider>,
    >,
    noop: Arc<NoopHandler>,
}

impl InnkeeperFactory {
    pub fn new(engine: Arc<Engine>, password: String) -> Self {
        let auth_source = InnkeeperAuthSource { password };
        Self {
            handler: Arc::new(InnkeeperHandler::new(engine)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                DefaultServerParameterProvider::default(),
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for InnkeeperFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client socket until it disconnects.
pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> std::io::Result<()> {
    let factory = Arc::new(InnkeeperFactory::new(engine, password));
    pgwire::tokio::process_socket(socket, tls, factory).await
}

// ── Error mapping ────────────────────────────────────────────────

fn user_error(code: &str, message: String) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        message,
    )))
}

/// SQLSTATE for each engine failure.
fn engine_code(e: &EngineError) -> &'static str {
    match e {
        EngineError::InvalidRange { .. } => "22023",
        EngineError::Conflict(_) => "23P01",
        EngineError::NotFound(_) => "P0002",
        EngineError::NotCheckedIn { .. } => "42501",
        EngineError::InvalidRating(_) => "22003",
        EngineError::NotActive(_) | EngineError::InvalidTransition { .. } => "55000",
        EngineError::AlreadyExists(_) => "23505",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::WalError(_) => "XX000",
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    if let EngineError::WalError(cause) = &e {
        tracing::error!("request failed on WAL write: {cause}");
        return user_error(engine_code(&e), "could not process request".into());
    }
    user_error(engine_code(&e), e.to_string())
}

fn sql_err(e: SqlError) -> PgWireError {
    let code = match e {
        SqlError::BadTimestamp(_) => "22007",
        _ => "42601",
    };
    user_error(code, e.to_string())
}

#[cfg(test)]
mod tests {
    use ulid::Ulid;

    use super::*;

    #[test]
    fn count_params_finds_highest() {
        assert_eq!(count_params("SELECT * FROM rooms"), 0);
        assert_eq!(count_params("INSERT INTO check_ins (booking_id) VALUES ($1)"), 1);
        assert_eq!(count_params("... VALUES ($2, $1, $10)"), 10);
    }

    #[test]
    fn bound_values_are_not_rescanned() {
        let sql = "INSERT INTO bookings (room_id, special_requests) VALUES ($1, $2)";
        let bound = bind_params(sql, &[Some("01ARZ3NDEKTSV4RRFFQ69G5FAV"), Some("pay $1 at desk")]);
        assert_eq!(
            bound,
            "INSERT INTO bookings (room_id, special_requests) \
             VALUES ('01ARZ3NDEKTSV4RRFFQ69G5FAV', 'pay $1 at desk')"
        );
    }

    #[test]
    fn bind_params_handles_wide_indexes_quotes_and_nulls() {
        let params: Vec<Option<String>> = (1..=10).map(|n| Some(format!("v{n}"))).collect();
        assert_eq!(bind_params("$10 $1", &params), "'v10' 'v1'");
        assert_eq!(bind_params("$1, $2", &[Some("it's"), None]), "'it''s', NULL");
        assert_eq!(bind_params("'$1' $1 $3", &[Some("x")]), "'$1' 'x' $3");
        assert_eq!(bind_params("price $ 5", &[Some("x")]), "price $ 5");
    }

    #[test]
    fn engine_errors_map_to_stable_codes() {
        let id = Ulid::new();
        assert_eq!(engine_code(&EngineError::Conflict(id)), "23P01");
        assert_eq!(
            engine_code(&EngineError::InvalidRange { check_in: 2, check_out: 1 }),
            "22023"
        );
        assert_eq!(
            engine_code(&EngineError::NotCheckedIn { room_id: id, guest: "a".into() }),
            "42501"
        );
        assert_eq!(engine_code(&EngineError::InvalidRating(9)), "22003");
        assert_eq!(engine_code(&EngineError::NotActive(id)), "55000");
        assert_eq!(engine_code(&EngineError::NotFound(id)), "P0002");
    }

    #[test]
    fn wal_errors_hide_the_cause() {
        let rendered = format!("{:?}", engine_err(EngineError::WalError("disk full".into())));
        assert!(rendered.contains("XX000"));
        assert!(rendered.contains("could not process request"));
        assert!(!rendered.contains("disk full"));
    }

    #[test]
    fn schema_follows_target_table() {
        let width = |sql: &str| schema_for(sql).len();
        assert_eq!(width("SELECT * FROM availability"), 10);
        assert_eq!(width("SELECT * FROM rooms WHERE id = $1"), 10);
        assert_eq!(
            width("INSERT INTO extensions (booking_id, guest, check_out) VALUES ($1, $2, $3)"),
            11
        );
        assert_eq!(width("SELECT * FROM room_detail WHERE room_id = $1 AND guest = $2"), 12);
        assert_eq!(width("SELECT * FROM checked_in WHERE guest = $1"), 4);
        assert_eq!(width("INSERT INTO rooms (name, price, capacity) VALUES ($1, $2, $3)"), 0);
    }
}
