use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub type Id = i64;

pub const SEED_ADMIN_EMAIL: &str = "admin@test.local";
pub const SEED_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    Unauthorized,
    #[error("Admin access required")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

impl BackendError {
    fn status(&self) -> StatusCode {
        match self {
            BackendError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BackendError::InvalidCredentials | BackendError::Unauthorized => StatusCode::UNAUTHORIZED,
            BackendError::Forbidden => StatusCode::FORBIDDEN,
            BackendError::NotFound(_) => StatusCode::NOT_FOUND,
            BackendError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            BackendError::Unauthorized => Some("Sign in again to obtain a new token"),
            _ => None,
        }
    }
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let mut body = json!({ "success": false, "message": self.to_string() });
        if let Some(hint) = self.hint() {
            body["hint"] = Value::from(hint);
        }
        (self.status(), Json(body)).into_response()
    }
}

type Result<T> = std::result::Result<T, BackendError>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
}

#[derive(Clone, Debug)]
struct Account {
    user: User,
    password: String,
}

#[derive(Deserialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrewMember {
    pub personnel_id: Id,
    pub role: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Crew {
    pub id: Id,
    pub name: String,
    pub uav_type: Option<String>,
    pub members: Vec<CrewMember>,
    pub avatar_data: Option<String>,
}

#[derive(Deserialize)]
pub struct CrewInput {
    pub name: String,
    pub uav_type: Option<String>,
    #[serde(default)]
    pub members: Vec<CrewMember>,
    pub avatar_data: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EquipmentType {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct EquipmentTypeInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Equipment {
    pub id: Id,
    pub name: String,
    pub type_id: Id,
    pub type_uav: Option<String>,
    pub photo_path: Option<String>,
    pub photo_data: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct EquipmentInput {
    pub name: String,
    pub type_id: Id,
    pub type_uav: Option<String>,
    pub photo_path: Option<String>,
    pub photo_data: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Personnel {
    pub id: Id,
    pub shpk: String,
    pub full_name: String,
    pub position: Option<String>,
    pub rank: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub unit_id: Option<Id>,
    pub user_id: Option<Id>,
}

#[derive(Deserialize)]
pub struct PersonnelInput {
    pub shpk: String,
    pub full_name: String,
    pub position: Option<String>,
    pub rank: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub unit_id: Option<Id>,
    pub user_id: Option<Id>,
}

#[derive(Default)]
pub struct Backend {
    next_id: Id,
    accounts: HashMap<Id, Account>,
    tokens: HashMap<String, Id>,
    personnel: HashMap<Id, Personnel>,
    crews: HashMap<Id, Crew>,
    equipment_types: HashMap<Id, EquipmentType>,
    equipment: HashMap<Id, Equipment>,
}

impl Backend {
    fn allocate_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn find_account(&self, email: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.user.email.eq_ignore_ascii_case(email))
    }

    fn insert_account(&mut self, email: &str, password: &str, full_name: Option<String>, role: &str) -> User {
        let id = self.allocate_id();
        let user = User {
            id,
            email: email.to_string(),
            full_name,
            role: role.to_string(),
        };
        self.accounts.insert(
            id,
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        user
    }

    fn issue_token(&mut self, user_id: Id) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<&User> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(BackendError::Unauthorized)?;
        self.tokens
            .get(token)
            .and_then(|id| self.accounts.get(id))
            .map(|a| &a.user)
            .ok_or(BackendError::Unauthorized)
    }

    fn authenticate_admin(&self, headers: &HeaderMap) -> Result<&User> {
        let user = self.authenticate(headers)?;
        match user.role.as_str() {
            "Admin" | "SystemAdmin" => Ok(user),
            _ => Err(BackendError::Forbidden),
        }
    }
}

pub type Db = Arc<RwLock<Backend>>;

/// Router with the seeded system administrator account.
pub fn app() -> Router {
    app_with(true)
}

pub fn app_with(seed_admin: bool) -> Router {
    let mut backend = Backend::default();
    if seed_admin {
        backend.insert_account(SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD, None, "SystemAdmin");
    }
    let db: Db = Arc::new(RwLock::new(backend));
    Router::new()
        .route("/api", get(api_info))
        .route("/api/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/profile", get(profile))
        .route("/api/personnel", get(list_personnel).post(create_personnel))
        .route(
            "/api/personnel/{id}",
            get(get_personnel).put(update_personnel).delete(delete_personnel),
        )
        .route("/api/crews", get(list_crews).post(create_crew))
        .route("/api/crews/{id}", get(get_crew).put(update_crew).delete(delete_crew))
        .route(
            "/api/equipment/types",
            get(list_equipment_types).post(create_equipment_type),
        )
        .route(
            "/api/equipment/types/{id}",
            axum::routing::put(update_equipment_type).delete(delete_equipment_type),
        )
        .route("/api/equipment", get(list_equipment).post(create_equipment))
        .route(
            "/api/equipment/{id}",
            axum::routing::put(update_equipment).delete(delete_equipment),
        )
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}", get(get_user))
        .fallback(route_not_found)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> std::result::Result<(), std::io::Error> {
    run_app(listener, app()).await
}

pub async fn run_app(listener: TcpListener, app: Router) -> std::result::Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock backend listening");
    }
    axum::serve(listener, app).await
}

fn ok_data<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

fn ok_message(message: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": message }))
}

async fn api_info() -> Json<Value> {
    Json(json!({ "success": true, "message": "Training Recording System API", "version": "1.0.0" }))
}

async fn health() -> Json<Value> {
    ok_message("Server is running")
}

async fn route_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
        .into_response()
}

// --- auth ---

async fn register(State(db): State<Db>, Json(input): Json<Registration>) -> Result<(StatusCode, Json<Value>)> {
    if input.password.len() < 6 {
        return Err(BackendError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    let mut db = db.write().await;
    if db.find_account(&input.email).is_some() {
        return Err(BackendError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }
    let user = db.insert_account(&input.email, &input.password, Some(input.full_name), "User");
    let token = db.issue_token(user.id);
    debug!(user_id = user.id, "registered user");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "token": token, "user": user })),
    ))
}

async fn login(State(db): State<Db>, Json(input): Json<Credentials>) -> Result<Json<Value>> {
    let mut db = db.write().await;
    let user = db
        .find_account(&input.email)
        .filter(|a| a.password == input.password)
        .map(|a| a.user.clone())
        .ok_or(BackendError::InvalidCredentials)?;
    let token = db.issue_token(user.id);
    debug!(user_id = user.id, "user signed in");
    Ok(Json(json!({ "success": true, "token": token, "user": user })))
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    if let Some(token) = token {
        db.tokens.remove(&token);
    }
    Ok(ok_message("Logged out"))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>> {
    let db = db.read().await;
    let user = db.authenticate(&headers)?;
    Ok(Json(json!({ "success": true, "user": user })))
}

async fn profile(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>> {
    let db = db.read().await;
    let user = db.authenticate(&headers)?;
    let personnel = db.personnel.values().find(|p| p.user_id == Some(user.id));
    Ok(ok_data(json!({ "user": user, "personnel": personnel })))
}

// --- personnel ---

fn personnel_from(id: Id, input: PersonnelInput) -> Personnel {
    Personnel {
        id,
        shpk: input.shpk,
        full_name: input.full_name,
        position: input.position,
        rank: input.rank,
        phone: input.phone,
        email: input.email,
        unit_id: input.unit_id,
        user_id: input.user_id,
    }
}

async fn list_personnel(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>> {
    let db = db.read().await;
    db.authenticate(&headers)?;
    let mut all: Vec<&Personnel> = db.personnel.values().collect();
    all.sort_by_key(|p| p.id);
    Ok(ok_data(all))
}

async fn get_personnel(State(db): State<Db>, headers: HeaderMap, Path(id): Path<Id>) -> Result<Json<Value>> {
    let db = db.read().await;
    db.authenticate(&headers)?;
    let person = db.personnel.get(&id).ok_or(BackendError::NotFound("Personnel"))?;
    Ok(ok_data(person))
}

async fn create_personnel(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<PersonnelInput>,
) -> Result<(StatusCode, Json<Value>)> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    if db.personnel.values().any(|p| p.shpk == input.shpk) {
        return Err(BackendError::Conflict(format!(
            "Personnel with service number {} already exists",
            input.shpk
        )));
    }
    let id = db.allocate_id();
    let person = personnel_from(id, input);
    db.personnel.insert(id, person.clone());
    Ok((StatusCode::CREATED, ok_data(person)))
}

async fn update_personnel(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Id>,
    Json(input): Json<PersonnelInput>,
) -> Result<Json<Value>> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    let slot = db.personnel.get_mut(&id).ok_or(BackendError::NotFound("Personnel"))?;
    *slot = personnel_from(id, input);
    Ok(ok_data(slot.clone()))
}

async fn delete_personnel(State(db): State<Db>, headers: HeaderMap, Path(id): Path<Id>) -> Result<Json<Value>> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    db.personnel.remove(&id).ok_or(BackendError::NotFound("Personnel"))?;
    for crew in db.crews.values_mut() {
        crew.members.retain(|m| m.personnel_id != id);
    }
    Ok(ok_message("Personnel deleted"))
}

// --- crews ---

fn crew_from(id: Id, input: CrewInput) -> Crew {
    Crew {
        id,
        name: input.name,
        uav_type: input.uav_type,
        members: input.members,
        avatar_data: input.avatar_data,
    }
}

async fn list_crews(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>> {
    let db = db.read().await;
    db.authenticate(&headers)?;
    let mut all: Vec<&Crew> = db.crews.values().collect();
    all.sort_by_key(|c| c.id);
    Ok(ok_data(all))
}

async fn get_crew(State(db): State<Db>, headers: HeaderMap, Path(id): Path<Id>) -> Result<Json<Value>> {
    let db = db.read().await;
    db.authenticate(&headers)?;
    let crew = db.crews.get(&id).ok_or(BackendError::NotFound("Crew"))?;
    Ok(ok_data(crew))
}

fn check_members(db: &Backend, members: &[CrewMember]) -> Result<()> {
    match members.iter().find(|m| !db.personnel.contains_key(&m.personnel_id)) {
        Some(m) => Err(BackendError::BadRequest(format!(
            "Unknown personnel {}",
            m.personnel_id
        ))),
        None => Ok(()),
    }
}

async fn create_crew(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CrewInput>,
) -> Result<(StatusCode, Json<Value>)> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    check_members(&db, &input.members)?;
    let id = db.allocate_id();
    let crew = crew_from(id, input);
    db.crews.insert(id, crew.clone());
    Ok((StatusCode::CREATED, ok_data(crew)))
}

async fn update_crew(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Id>,
    Json(input): Json<CrewInput>,
) -> Result<Json<Value>> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    check_members(&db, &input.members)?;
    let slot = db.crews.get_mut(&id).ok_or(BackendError::NotFound("Crew"))?;
    *slot = crew_from(id, input);
    Ok(ok_data(slot.clone()))
}

async fn delete_crew(State(db): State<Db>, headers: HeaderMap, Path(id): Path<Id>) -> Result<Json<Value>> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    db.crews.remove(&id).ok_or(BackendError::NotFound("Crew"))?;
    Ok(ok_message("Crew deleted"))
}

// --- equipment ---

async fn list_equipment_types(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>> {
    let db = db.read().await;
    db.authenticate(&headers)?;
    let mut all: Vec<&EquipmentType> = db.equipment_types.values().collect();
    all.sort_by_key(|t| t.id);
    Ok(ok_data(all))
}

async fn create_equipment_type(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<EquipmentTypeInput>,
) -> Result<(StatusCode, Json<Value>)> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    let id = db.allocate_id();
    let kind = EquipmentType {
        id,
        name: input.name,
        description: input.description,
    };
    db.equipment_types.insert(id, kind.clone());
    Ok((StatusCode::CREATED, ok_data(kind)))
}

async fn update_equipment_type(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Id>,
    Json(input): Json<EquipmentTypeInput>,
) -> Result<Json<Value>> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    let slot = db
        .equipment_types
        .get_mut(&id)
        .ok_or(BackendError::NotFound("Equipment type"))?;
    slot.name = input.name;
    slot.description = input.description;
    Ok(ok_data(slot.clone()))
}

async fn delete_equipment_type(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> Result<Json<Value>> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    if !db.equipment_types.contains_key(&id) {
        return Err(BackendError::NotFound("Equipment type"));
    }
    if db.equipment.values().any(|e| e.type_id == id) {
        return Err(BackendError::Conflict("Equipment type is in use".to_string()));
    }
    db.equipment_types.remove(&id);
    Ok(ok_message("Equipment type deleted"))
}

fn check_equipment_type(db: &Backend, type_id: Id) -> Result<()> {
    if db.equipment_types.contains_key(&type_id) {
        Ok(())
    } else {
        Err(BackendError::BadRequest(format!("Unknown equipment type {type_id}")))
    }
}

fn equipment_from(id: Id, input: EquipmentInput) -> Equipment {
    Equipment {
        id,
        name: input.name,
        type_id: input.type_id,
        type_uav: input.type_uav,
        photo_path: input.photo_path,
        photo_data: input.photo_data,
        notes: input.notes,
        status: input.status.or_else(|| Some("active".to_string())),
    }
}

async fn list_equipment(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>> {
    let db = db.read().await;
    db.authenticate(&headers)?;
    let mut all: Vec<&Equipment> = db.equipment.values().collect();
    all.sort_by_key(|e| e.id);
    Ok(ok_data(all))
}

async fn create_equipment(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<EquipmentInput>,
) -> Result<(StatusCode, Json<Value>)> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    check_equipment_type(&db, input.type_id)?;
    let id = db.allocate_id();
    let item = equipment_from(id, input);
    db.equipment.insert(id, item.clone());
    Ok((StatusCode::CREATED, ok_data(item)))
}

async fn update_equipment(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Id>,
    Json(input): Json<EquipmentInput>,
) -> Result<Json<Value>> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    if !db.equipment.contains_key(&id) {
        return Err(BackendError::NotFound("Equipment"));
    }
    check_equipment_type(&db, input.type_id)?;
    let item = equipment_from(id, input);
    db.equipment.insert(id, item.clone());
    Ok(ok_data(item))
}

async fn delete_equipment(State(db): State<Db>, headers: HeaderMap, Path(id): Path<Id>) -> Result<Json<Value>> {
    let mut db = db.write().await;
    db.authenticate(&headers)?;
    db.equipment.remove(&id).ok_or(BackendError::NotFound("Equipment"))?;
    Ok(ok_message("Equipment deleted"))
}

// --- admin ---

async fn list_users(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>> {
    let db = db.read().await;
    db.authenticate_admin(&headers)?;
    let mut all: Vec<&User> = db.accounts.values().map(|a| &a.user).collect();
    all.sort_by_key(|u| u.id);
    Ok(ok_data(all))
}

async fn get_user(State(db): State<Db>, headers: HeaderMap, Path(id): Path<Id>) -> Result<Json<Value>> {
    let db = db.read().await;
    db.authenticate_admin(&headers)?;
    let account = db.accounts.get(&id).ok_or(BackendError::NotFound("User"))?;
    Ok(ok_data(&account.user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crew_input_defaults_members() {
        let input: CrewInput = serde_json::from_str(r#"{"name":"Alpha"}"#).unwrap();
        assert_eq!(input.name, "Alpha");
        assert!(input.members.is_empty());
        assert!(input.uav_type.is_none());
    }

    #[test]
    fn crew_input_rejects_missing_name() {
        let result: std::result::Result<CrewInput, _> = serde_json::from_str(r#"{"members":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn personnel_input_requires_service_number() {
        let result: std::result::Result<PersonnelInput, _> =
            serde_json::from_str(r#"{"full_name":"Ivan Petrenko"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn error_body_carries_message_and_hint() {
        let response = BackendError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(BackendError::NotFound("Crew").to_string(), "Crew not found");
        assert_eq!(BackendError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert!(BackendError::Unauthorized.hint().is_some());
        assert!(BackendError::Conflict("x".to_string()).hint().is_none());
    }

    #[test]
    fn bearer_token_authenticates_account() {
        let mut backend = Backend::default();
        let user = backend.insert_account("pilot@unit.org", "secret1", None, "User");
        let token = backend.issue_token(user.id);

        let mut headers = HeaderMap::new();
        assert!(matches!(backend.authenticate(&headers), Err(BackendError::Unauthorized)));

        headers.insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        assert_eq!(backend.authenticate(&headers).unwrap().id, user.id);
        assert!(matches!(
            backend.authenticate_admin(&headers),
            Err(BackendError::Forbidden)
        ));
    }

    #[test]
    fn account_lookup_ignores_email_case() {
        let mut backend = Backend::default();
        backend.insert_account("Pilot@Unit.org", "secret1", None, "User");
        assert!(backend.find_account("pilot@unit.org").is_some());
    }
}
