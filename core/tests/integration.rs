//! End-to-end tests against the live mock backend.
//!
//! # Design
//! Starts the mock server on a random port, then drives `ApiClient` over
//! real HTTP through a ureq-backed `Transport`. Validates that request
//! building, bearer handling and `handle_response` agree with the actual
//! server's envelopes and status codes.

use std::rc::Rc;

use roster_core::storage::AUTH_TOKEN_KEY;
use roster_core::{
    ApiClient, ApiError, Credentials, CrewInput, CrewMember, EquipmentInput, EquipmentTypeInput,
    HttpMethod, HttpRequest, HttpResponse, KeyValueStore, MemoryStore, Mode, PersonnelInput,
    Registration, ResolvedConfig, Role, SessionContext, Transport, TransportError,
};

/// Executes an `HttpRequest` with ureq.
///
/// ureq's status-code-as-error behavior is disabled so 4xx/5xx responses
/// come back as data and the core does all status interpretation.
struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = match req.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&req.url);
                for (name, value) in &req.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(&req.url);
                for (name, value) in &req.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post | HttpMethod::Put => {
                let mut builder = if req.method == HttpMethod::Post {
                    self.agent.post(&req.url)
                } else {
                    self.agent.put(&req.url)
                };
                for (name, value) in &req.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match req.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().unwrap_or_default();
        Ok(HttpResponse::new(status, body))
    }
}

fn spawn_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client_for(endpoint: &str, store: Rc<MemoryStore>) -> ApiClient {
    let session = SessionContext::new(ResolvedConfig::remote(endpoint), store);
    ApiClient::connect(session, UreqTransport::new(), None)
}

fn admin_credentials() -> Credentials {
    Credentials {
        email: mock_server::SEED_ADMIN_EMAIL.to_string(),
        password: mock_server::SEED_ADMIN_PASSWORD.to_string(),
    }
}

#[test]
fn admin_session_lifecycle() {
    let addr = spawn_server();
    let store = Rc::new(MemoryStore::new());
    let client = client_for(&format!("http://{addr}/api"), Rc::clone(&store));
    assert_eq!(client.mode(), Mode::Remote);

    // Step 1: protected calls fail fast without a token.
    assert!(matches!(client.current_user(), Err(ApiError::MissingToken)));

    // Step 2: login stores the token.
    let session = client.login(&admin_credentials()).unwrap();
    assert!(session.success);
    let token = session.token.clone().unwrap();
    assert_eq!(store.get(AUTH_TOKEN_KEY).as_deref(), Some(token.as_str()));

    // Step 3: current user carries the admin role.
    let me = client.current_user().unwrap();
    assert_eq!(me.email, mock_server::SEED_ADMIN_EMAIL);
    assert_eq!(me.role, Role::SystemAdmin);
    assert!(me.role.is_admin());

    // Step 4: admin can list users.
    let users = client.list_users().unwrap();
    assert!(users.iter().any(|u| u.id == me.id));
    assert_eq!(client.get_user(me.id).unwrap(), me);

    // Step 5: logout clears the token, and the server revoked it.
    client.logout().unwrap();
    assert!(client.token().is_none());
    assert!(store.get(AUTH_TOKEN_KEY).is_none());
    client.set_token(&token);
    let err = client.current_user().unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert!(client.token().is_none(), "rejected token must be purged");
}

#[test]
fn crew_and_equipment_crud() {
    let addr = spawn_server();
    let client = client_for(&format!("http://{addr}/api"), Rc::new(MemoryStore::new()));
    client.login(&admin_credentials()).unwrap();

    // personnel
    let person = client
        .create_personnel(&PersonnelInput {
            shpk: "A-1001".to_string(),
            full_name: "Ivan Petrenko".to_string(),
            position: None,
            rank: Some("Sergeant".to_string()),
            phone: None,
            email: None,
            unit_id: None,
            user_id: None,
        })
        .unwrap();
    assert_eq!(client.list_personnel().unwrap().len(), 1);

    // crews
    let crew = client
        .create_crew(&CrewInput {
            name: "Alpha".to_string(),
            uav_type: Some("FPV".to_string()),
            members: vec![CrewMember {
                personnel_id: person.id,
                role: "pilot".to_string(),
            }],
            avatar_data: None,
        })
        .unwrap();
    assert_eq!(crew.members.len(), 1);
    assert_eq!(client.get_crew(crew.id).unwrap(), crew);

    let renamed = client
        .update_crew(
            crew.id,
            &CrewInput {
                name: "Alpha-2".to_string(),
                uav_type: None,
                members: Vec::new(),
                avatar_data: None,
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Alpha-2");
    assert_eq!(client.list_crews().unwrap().len(), 1);

    client.delete_crew(crew.id).unwrap();
    let err = client.get_crew(crew.id).unwrap_err();
    match err {
        ApiError::NotFound { message } => assert_eq!(message, "Crew not found"),
        other => panic!("expected NotFound, got {other:?}"),
    }

    // equipment types and equipment
    let kind = client
        .create_equipment_type(&EquipmentTypeInput {
            name: "Quadcopter".to_string(),
            description: None,
        })
        .unwrap();
    let item = client
        .create_equipment(&EquipmentInput {
            name: "Mavic 3".to_string(),
            type_id: kind.id,
            type_uav: None,
            photo_path: None,
            photo_data: None,
            notes: Some("spare props".to_string()),
            status: None,
        })
        .unwrap();
    assert_eq!(item.status.as_deref(), Some("active"));
    assert_eq!(client.list_equipment().unwrap(), vec![item.clone()]);

    let err = client.delete_equipment_type(kind.id).unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 409, .. }));
    assert_eq!(err.to_string(), "Equipment type is in use");

    client.delete_equipment(item.id).unwrap();
    client.delete_equipment_type(kind.id).unwrap();
    assert!(client.list_equipment_types().unwrap().is_empty());
}

#[test]
fn register_or_find_user_resolves_duplicates() {
    let addr = spawn_server();
    let client = client_for(&format!("http://{addr}/api"), Rc::new(MemoryStore::new()));
    client.login(&admin_credentials()).unwrap();
    let admin_token = client.token();

    let registration = Registration {
        full_name: "Olena Kovalenko".to_string(),
        email: "olena@unit.org".to_string(),
        password: "secret1".to_string(),
    };
    let created = client.register_or_find_user(&registration).unwrap();
    assert!(created.is_some());
    assert_eq!(client.token(), admin_token, "admin session must survive");

    let found = client.register_or_find_user(&registration).unwrap();
    assert_eq!(found, created);
}

#[test]
fn wrong_password_is_a_server_error_not_session_expiry() {
    let addr = spawn_server();
    let client = client_for(&format!("http://{addr}/api"), Rc::new(MemoryStore::new()));

    let err = client
        .login(&Credentials {
            email: mock_server::SEED_ADMIN_EMAIL.to_string(),
            password: "wrong".to_string(),
        })
        .unwrap_err();
    match err {
        ApiError::Server { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("expected Server, got {other:?}"),
    }
}

#[test]
fn unreachable_backend_is_a_connectivity_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let endpoint = format!("http://{addr}/api");
    let client = client_for(&endpoint, Rc::new(MemoryStore::new()));

    let err = client.login(&admin_credentials()).unwrap_err();
    match err {
        ApiError::Connectivity { base_url, .. } => assert_eq!(base_url, endpoint),
        other => panic!("expected Connectivity, got {other:?}"),
    }
}
