//! The dual-mode API client façade.
//!
//! # Design
//! `ApiClient` owns the `SessionContext` and the provider selected for the
//! page. Every backend operation has one method here; each builds an
//! `Operation`, dispatches it through the provider and runs the reply
//! through `handle_response`, which is the single place where HTTP statuses
//! turn into `ApiError` variants. `dispatch` and `handle_response` stay
//! public so a host can await the raw reply itself and parse later.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::Mode;
use crate::error::ApiError;
use crate::http::{HttpResponse, Transport};
use crate::operation::Operation;
use crate::provider::{select_provider, DataProvider, LocalBackend, Reply};
use crate::session::SessionContext;
use crate::types::{
    envelope_data, envelope_member, from_reply, to_body, AuthSession, Credentials, Crew, CrewInput,
    Equipment, EquipmentInput, EquipmentType, EquipmentTypeInput, Id, Personnel, PersonnelInput,
    Registration, Role, User,
};

const LOCAL_DB_SUGGESTION: &str =
    "\n\nAlternative: switch to the local database with ?localDb=true or USE_LOCAL_DB=true";

pub struct ApiClient {
    session: SessionContext,
    provider: Box<dyn DataProvider>,
}

impl ApiClient {
    pub fn new(session: SessionContext, provider: Box<dyn DataProvider>) -> Self {
        Self { session, provider }
    }

    /// Selects the provider from the session's mode flag.
    pub fn connect<T: Transport + 'static>(
        session: SessionContext,
        transport: T,
        local: Option<Box<dyn LocalBackend>>,
    ) -> Self {
        let provider = select_provider(session.config(), transport, local);
        Self::new(session, provider)
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn mode(&self) -> Mode {
        self.provider.mode()
    }

    pub fn token(&self) -> Option<String> {
        self.session.token()
    }

    pub fn set_token(&self, token: &str) {
        self.session.set_token(token)
    }

    pub fn clear_token(&self) {
        self.session.clear_token()
    }

    /// Sends `op` to the active provider without interpreting the reply.
    pub fn dispatch(&self, op: Operation) -> Result<Reply, ApiError> {
        debug!(operation = op.name(), mode = ?self.provider.mode(), "dispatching operation");
        let token = self.session.token();
        self.provider.dispatch(&op, token.as_deref())
    }

    /// Turns a reply into its JSON value or the matching `ApiError`.
    pub fn handle_response(&self, reply: Reply) -> Result<Value, ApiError> {
        let (response, authenticated) = match reply {
            Reply::Local(value) => return Ok(value),
            Reply::Http {
                response,
                authenticated,
            } => (response, authenticated),
        };

        if response.is_opaque() {
            return Err(ApiError::CrossOriginRejected);
        }

        let parsed = parse_body(&response);
        if response.is_success() {
            return parsed.map_err(|e| ApiError::Deserialization(e.to_string()));
        }

        if response.status == 401 && authenticated {
            warn!("server rejected the session token, clearing it");
            self.session.clear_token();
            return Err(ApiError::SessionExpired);
        }

        let data = parsed.unwrap_or_else(|_| Value::Object(Map::new()));
        let message = server_message(&data, response.status);
        if response.status == 404 {
            return Err(ApiError::NotFound { message });
        }
        Err(ApiError::Server {
            status: response.status,
            message,
        })
    }

    /// `dispatch` followed by `handle_response`.
    pub fn call(&self, op: Operation) -> Result<Value, ApiError> {
        let reply = self.dispatch(op)?;
        self.handle_response(reply)
    }

    fn require_token(&self) -> Result<(), ApiError> {
        if self.mode() == Mode::Remote && self.session.token().is_none() {
            return Err(ApiError::MissingToken);
        }
        Ok(())
    }

    fn start_session(&self, value: Value) -> Result<AuthSession, ApiError> {
        let session: AuthSession = from_reply(value)?;
        if session.success {
            if let Some(token) = session.token.as_deref() {
                self.session.set_token(token);
            }
        }
        Ok(session)
    }

    // --- auth ---

    pub fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        let value = self.call(Operation::Register(to_body(registration)?))?;
        self.start_session(value)
    }

    pub fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        let value = self.call(Operation::Login(to_body(credentials)?))?;
        self.start_session(value)
    }

    /// Ends the session. The token is cleared even when the server call
    /// fails.
    pub fn logout(&self) -> Result<(), ApiError> {
        let result = self.call(Operation::Logout);
        self.session.clear_token();
        result.map(|_| ())
    }

    pub fn current_user(&self) -> Result<User, ApiError> {
        self.require_token()?;
        envelope_member(self.call(Operation::CurrentUser)?, "user")
    }

    pub fn profile(&self) -> Result<Value, ApiError> {
        self.require_token()?;
        self.call(Operation::Profile)
    }

    /// Creates an account for someone else (the session token is left
    /// alone) and returns its id. When the email is already registered the
    /// id is looked up among admin users instead; that lookup is best-effort
    /// and yields `None` on failure.
    pub fn register_or_find_user(&self, registration: &Registration) -> Result<Option<Id>, ApiError> {
        match self.call(Operation::Register(to_body(registration)?)) {
            Ok(value) => {
                let session: AuthSession = from_reply(value)?;
                Ok(session.user.map(|u| u.id))
            }
            Err(err) if is_duplicate(&err) => Ok(self.find_user_by_email(&registration.email)),
            Err(err) => Err(err),
        }
    }

    fn find_user_by_email(&self, email: &str) -> Option<Id> {
        match self.list_users() {
            Ok(users) => users
                .into_iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .map(|u| u.id),
            Err(err) => {
                warn!(%err, "could not look up existing user");
                None
            }
        }
    }

    // --- personnel ---

    pub fn list_personnel(&self) -> Result<Vec<Personnel>, ApiError> {
        envelope_data(self.call(Operation::ListPersonnel)?)
    }

    pub fn create_personnel(&self, input: &PersonnelInput) -> Result<Personnel, ApiError> {
        envelope_data(self.call(Operation::CreatePersonnel(to_body(input)?))?)
    }

    pub fn update_personnel(&self, id: Id, input: &PersonnelInput) -> Result<Personnel, ApiError> {
        envelope_data(self.call(Operation::UpdatePersonnel(id, to_body(input)?))?)
    }

    pub fn delete_personnel(&self, id: Id) -> Result<(), ApiError> {
        self.call(Operation::DeletePersonnel(id)).map(|_| ())
    }

    pub fn create_personnel_account(&self, id: Id, credentials: &Credentials) -> Result<Value, ApiError> {
        self.call(Operation::CreatePersonnelAccount(id, to_body(credentials)?))
    }

    pub fn list_units(&self) -> Result<Value, ApiError> {
        self.call(Operation::ListUnits)
    }

    // --- crews ---

    pub fn list_crews(&self) -> Result<Vec<Crew>, ApiError> {
        envelope_data(self.call(Operation::ListCrews)?)
    }

    pub fn get_crew(&self, id: Id) -> Result<Crew, ApiError> {
        envelope_data(self.call(Operation::GetCrew(id))?)
    }

    pub fn create_crew(&self, input: &CrewInput) -> Result<Crew, ApiError> {
        envelope_data(self.call(Operation::CreateCrew(to_body(input)?))?)
    }

    pub fn update_crew(&self, id: Id, input: &CrewInput) -> Result<Crew, ApiError> {
        envelope_data(self.call(Operation::UpdateCrew(id, to_body(input)?))?)
    }

    pub fn delete_crew(&self, id: Id) -> Result<(), ApiError> {
        self.call(Operation::DeleteCrew(id)).map(|_| ())
    }

    // --- equipment ---

    pub fn list_equipment_types(&self) -> Result<Vec<EquipmentType>, ApiError> {
        envelope_data(self.call(Operation::ListEquipmentTypes)?)
    }

    pub fn create_equipment_type(&self, input: &EquipmentTypeInput) -> Result<EquipmentType, ApiError> {
        envelope_data(self.call(Operation::CreateEquipmentType(to_body(input)?))?)
    }

    pub fn update_equipment_type(&self, id: Id, input: &EquipmentTypeInput) -> Result<EquipmentType, ApiError> {
        envelope_data(self.call(Operation::UpdateEquipmentType(id, to_body(input)?))?)
    }

    pub fn delete_equipment_type(&self, id: Id) -> Result<(), ApiError> {
        self.call(Operation::DeleteEquipmentType(id)).map(|_| ())
    }

    pub fn list_equipment(&self) -> Result<Vec<Equipment>, ApiError> {
        envelope_data(self.call(Operation::ListEquipment)?)
    }

    pub fn create_equipment(&self, input: &EquipmentInput) -> Result<Equipment, ApiError> {
        envelope_data(self.call(Operation::CreateEquipment(to_body(input)?))?)
    }

    pub fn update_equipment(&self, id: Id, input: &EquipmentInput) -> Result<Equipment, ApiError> {
        envelope_data(self.call(Operation::UpdateEquipment(id, to_body(input)?))?)
    }

    pub fn delete_equipment(&self, id: Id) -> Result<(), ApiError> {
        self.call(Operation::DeleteEquipment(id)).map(|_| ())
    }

    // --- courses, modules, lessons ---

    pub fn list_courses(&self) -> Result<Value, ApiError> {
        self.call(Operation::ListCourses)
    }

    pub fn get_course(&self, id: Id) -> Result<Value, ApiError> {
        self.call(Operation::GetCourse(id))
    }

    pub fn create_course(&self, course: Value) -> Result<Value, ApiError> {
        self.call(Operation::CreateCourse(course))
    }

    pub fn update_course(&self, id: Id, course: Value) -> Result<Value, ApiError> {
        self.call(Operation::UpdateCourse(id, course))
    }

    pub fn start_course(&self, id: Id) -> Result<Value, ApiError> {
        self.call(Operation::StartCourse(id))
    }

    pub fn add_course_material(&self, course_id: Id, material_id: Id) -> Result<Value, ApiError> {
        self.call(Operation::AddCourseMaterial {
            course_id,
            material_id,
        })
    }

    pub fn list_course_modules(&self, course_id: Id) -> Result<Value, ApiError> {
        self.call(Operation::ListCourseModules(course_id))
    }

    pub fn create_module(&self, module: Value) -> Result<Value, ApiError> {
        self.call(Operation::CreateModule(module))
    }

    pub fn update_module(&self, id: Id, module: Value) -> Result<Value, ApiError> {
        self.call(Operation::UpdateModule(id, module))
    }

    pub fn list_module_lessons(&self, module_id: Id) -> Result<Value, ApiError> {
        self.call(Operation::ListModuleLessons(module_id))
    }

    pub fn get_lesson(&self, id: Id) -> Result<Value, ApiError> {
        self.call(Operation::GetLesson(id))
    }

    pub fn create_lesson(&self, lesson: Value) -> Result<Value, ApiError> {
        self.call(Operation::CreateLesson(lesson))
    }

    pub fn update_lesson(&self, id: Id, lesson: Value) -> Result<Value, ApiError> {
        self.call(Operation::UpdateLesson(id, lesson))
    }

    pub fn start_lesson(&self, id: Id) -> Result<Value, ApiError> {
        self.call(Operation::StartLesson(id))
    }

    pub fn update_lesson_time(&self, id: Id, seconds: u64) -> Result<Value, ApiError> {
        self.call(Operation::UpdateLessonTime {
            lesson_id: id,
            seconds,
        })
    }

    pub fn complete_lesson(&self, id: Id) -> Result<Value, ApiError> {
        self.call(Operation::CompleteLesson(id))
    }

    // --- tests ---

    pub fn get_test(&self, id: Id) -> Result<Value, ApiError> {
        self.call(Operation::GetTest(id))
    }

    pub fn create_test(&self, test: Value) -> Result<Value, ApiError> {
        self.call(Operation::CreateTest(test))
    }

    pub fn update_test(&self, id: Id, test: Value) -> Result<Value, ApiError> {
        self.call(Operation::UpdateTest(id, test))
    }

    pub fn submit_test(&self, id: Id, answers: Value) -> Result<Value, ApiError> {
        self.call(Operation::SubmitTest(id, answers))
    }

    // --- knowledge base, practice ---

    pub fn list_knowledge_categories(&self) -> Result<Value, ApiError> {
        self.call(Operation::ListKnowledgeCategories)
    }

    pub fn create_knowledge_category(&self, category: Value) -> Result<Value, ApiError> {
        self.call(Operation::CreateKnowledgeCategory(category))
    }

    pub fn list_knowledge_materials(&self, category_id: Option<Id>) -> Result<Value, ApiError> {
        self.call(Operation::ListKnowledgeMaterials(category_id))
    }

    pub fn create_knowledge_material(&self, material: Value) -> Result<Value, ApiError> {
        self.call(Operation::CreateKnowledgeMaterial(material))
    }

    pub fn update_knowledge_material(&self, id: Id, material: Value) -> Result<Value, ApiError> {
        self.call(Operation::UpdateKnowledgeMaterial(id, material))
    }

    pub fn list_practice_videos(&self) -> Result<Value, ApiError> {
        self.call(Operation::ListPracticeVideos)
    }

    pub fn create_practice_video(&self, video: Value) -> Result<Value, ApiError> {
        self.call(Operation::CreatePracticeVideo(video))
    }

    // --- analytics ---

    pub fn course_analytics(&self, course_id: Id) -> Result<Value, ApiError> {
        self.call(Operation::CourseAnalytics(course_id))
    }

    pub fn learning_analytics(&self) -> Result<Value, ApiError> {
        self.call(Operation::LearningAnalytics)
    }

    pub fn user_analytics(&self, user_id: Id) -> Result<Value, ApiError> {
        self.call(Operation::UserAnalytics(user_id))
    }

    // --- admin ---

    pub fn list_users(&self) -> Result<Vec<User>, ApiError> {
        envelope_data(self.call(Operation::ListUsers)?)
    }

    pub fn get_user(&self, id: Id) -> Result<User, ApiError> {
        envelope_data(self.call(Operation::GetUser(id))?)
    }

    pub fn update_user_password(&self, id: Id, password: &str) -> Result<Value, ApiError> {
        self.call(Operation::UpdateUserPassword {
            user_id: id,
            password: password.to_string(),
        })
    }

    pub fn update_user_role(&self, id: Id, role: Role) -> Result<Value, ApiError> {
        self.call(Operation::UpdateUserRole { user_id: id, role })
    }
}

fn parse_body(response: &HttpResponse) -> Result<Value, serde_json::Error> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body)
}

/// Message for a failed reply: the server's `message` or `error`, else a
/// generic one, plus any `hint`.
fn server_message(data: &Value, status: u16) -> String {
    let field = |key: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    let server_text = field("message");
    let mut message = server_text
        .or_else(|| field("error"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("server error ({status})"));
    if let Some(hint) = field("hint") {
        message.push_str("\nHint: ");
        message.push_str(hint);
    }
    if server_text.is_some_and(reports_database_failure) {
        message.push_str(LOCAL_DB_SUGGESTION);
    }
    message
}

fn reports_database_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("password authentication") || lower.contains("database")
}

fn is_duplicate(err: &ApiError) -> bool {
    match err {
        ApiError::Server { status: 409, .. } => true,
        ApiError::Server { message, .. } => message.to_lowercase().contains("already exists"),
        _ => false,
    }
}
