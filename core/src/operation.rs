//! Catalogue of backend operations.
//!
//! Every call the client can make is one `Operation` value. The operation
//! owns its payload and knows its name (the method a local backend exposes
//! for it), its HTTP route under the API root, and whether it needs a
//! session. Providers interpret operations; they never invent routes.

use serde_json::{json, Value};

use crate::http::HttpMethod;
use crate::types::{Id, Role};

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Register(Value),
    Login(Value),
    Logout,
    CurrentUser,
    Profile,

    ListPersonnel,
    CreatePersonnel(Value),
    UpdatePersonnel(Id, Value),
    DeletePersonnel(Id),
    CreatePersonnelAccount(Id, Value),
    ListUnits,

    ListCrews,
    GetCrew(Id),
    CreateCrew(Value),
    UpdateCrew(Id, Value),
    DeleteCrew(Id),

    ListEquipmentTypes,
    CreateEquipmentType(Value),
    UpdateEquipmentType(Id, Value),
    DeleteEquipmentType(Id),
    ListEquipment,
    CreateEquipment(Value),
    UpdateEquipment(Id, Value),
    DeleteEquipment(Id),

    ListCourses,
    GetCourse(Id),
    CreateCourse(Value),
    UpdateCourse(Id, Value),
    StartCourse(Id),
    AddCourseMaterial { course_id: Id, material_id: Id },
    ListCourseModules(Id),
    CreateModule(Value),
    UpdateModule(Id, Value),
    ListModuleLessons(Id),
    GetLesson(Id),
    CreateLesson(Value),
    UpdateLesson(Id, Value),
    StartLesson(Id),
    UpdateLessonTime { lesson_id: Id, seconds: u64 },
    CompleteLesson(Id),

    GetTest(Id),
    CreateTest(Value),
    UpdateTest(Id, Value),
    SubmitTest(Id, Value),

    ListKnowledgeCategories,
    CreateKnowledgeCategory(Value),
    ListKnowledgeMaterials(Option<Id>),
    CreateKnowledgeMaterial(Value),
    UpdateKnowledgeMaterial(Id, Value),
    ListPracticeVideos,
    CreatePracticeVideo(Value),

    CourseAnalytics(Id),
    LearningAnalytics,
    UserAnalytics(Id),

    ListUsers,
    GetUser(Id),
    UpdateUserPassword { user_id: Id, password: String },
    UpdateUserRole { user_id: Id, role: Role },
}

impl Operation {
    /// Stable operation name, shared by both providers.
    pub fn name(&self) -> &'static str {
        use Operation::*;
        match self {
            Register(_) => "register",
            Login(_) => "login",
            Logout => "logout",
            CurrentUser => "current_user",
            Profile => "profile",
            ListPersonnel => "list_personnel",
            CreatePersonnel(_) => "create_personnel",
            UpdatePersonnel(..) => "update_personnel",
            DeletePersonnel(_) => "delete_personnel",
            CreatePersonnelAccount(..) => "create_personnel_account",
            ListUnits => "list_units",
            ListCrews => "list_crews",
            GetCrew(_) => "get_crew",
            CreateCrew(_) => "create_crew",
            UpdateCrew(..) => "update_crew",
            DeleteCrew(_) => "delete_crew",
            ListEquipmentTypes => "list_equipment_types",
            CreateEquipmentType(_) => "create_equipment_type",
            UpdateEquipmentType(..) => "update_equipment_type",
            DeleteEquipmentType(_) => "delete_equipment_type",
            ListEquipment => "list_equipment",
            CreateEquipment(_) => "create_equipment",
            UpdateEquipment(..) => "update_equipment",
            DeleteEquipment(_) => "delete_equipment",
            ListCourses => "list_courses",
            GetCourse(_) => "get_course",
            CreateCourse(_) => "create_course",
            UpdateCourse(..) => "update_course",
            StartCourse(_) => "start_course",
            AddCourseMaterial { .. } => "add_course_material",
            ListCourseModules(_) => "list_course_modules",
            CreateModule(_) => "create_module",
            UpdateModule(..) => "update_module",
            ListModuleLessons(_) => "list_module_lessons",
            GetLesson(_) => "get_lesson",
            CreateLesson(_) => "create_lesson",
            UpdateLesson(..) => "update_lesson",
            StartLesson(_) => "start_lesson",
            UpdateLessonTime { .. } => "update_lesson_time",
            CompleteLesson(_) => "complete_lesson",
            GetTest(_) => "get_test",
            CreateTest(_) => "create_test",
            UpdateTest(..) => "update_test",
            SubmitTest(..) => "submit_test",
            ListKnowledgeCategories => "list_knowledge_categories",
            CreateKnowledgeCategory(_) => "create_knowledge_category",
            ListKnowledgeMaterials(_) => "list_knowledge_materials",
            CreateKnowledgeMaterial(_) => "create_knowledge_material",
            UpdateKnowledgeMaterial(..) => "update_knowledge_material",
            ListPracticeVideos => "list_practice_videos",
            CreatePracticeVideo(_) => "create_practice_video",
            CourseAnalytics(_) => "course_analytics",
            LearningAnalytics => "learning_analytics",
            UserAnalytics(_) => "user_analytics",
            ListUsers => "list_users",
            GetUser(_) => "get_user",
            UpdateUserPassword { .. } => "update_user_password",
            UpdateUserRole { .. } => "update_user_role",
        }
    }

    /// Register and login are the only calls made without a session.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Operation::Register(_) | Operation::Login(_))
    }

    pub fn method(&self) -> HttpMethod {
        use Operation::*;
        match self {
            Register(_) | Login(_) | Logout | CreatePersonnel(_) | CreatePersonnelAccount(..)
            | CreateCrew(_) | CreateEquipmentType(_) | CreateEquipment(_) | CreateCourse(_)
            | StartCourse(_) | AddCourseMaterial { .. } | CreateModule(_) | CreateLesson(_)
            | StartLesson(_) | CompleteLesson(_) | CreateTest(_) | SubmitTest(..)
            | CreateKnowledgeCategory(_) | CreateKnowledgeMaterial(_)
            | CreatePracticeVideo(_) => HttpMethod::Post,
            UpdatePersonnel(..) | UpdateCrew(..) | UpdateEquipmentType(..) | UpdateEquipment(..)
            | UpdateCourse(..) | UpdateModule(..) | UpdateLesson(..) | UpdateLessonTime { .. }
            | UpdateTest(..) | UpdateKnowledgeMaterial(..) | UpdateUserPassword { .. }
            | UpdateUserRole { .. } => HttpMethod::Put,
            DeletePersonnel(_) | DeleteCrew(_) | DeleteEquipmentType(_) | DeleteEquipment(_) => {
                HttpMethod::Delete
            }
            _ => HttpMethod::Get,
        }
    }

    /// Path relative to the API root, without a leading slash.
    pub fn path(&self) -> String {
        use Operation::*;
        match self {
            Register(_) => "auth/register".to_string(),
            Login(_) => "auth/login".to_string(),
            Logout => "auth/logout".to_string(),
            CurrentUser => "auth/me".to_string(),
            Profile => "auth/profile".to_string(),
            ListPersonnel | CreatePersonnel(_) => "personnel".to_string(),
            UpdatePersonnel(id, _) | DeletePersonnel(id) => format!("personnel/{id}"),
            CreatePersonnelAccount(id, _) => format!("personnel/{id}/create-account"),
            ListUnits => "units".to_string(),
            ListCrews | CreateCrew(_) => "crews".to_string(),
            GetCrew(id) | UpdateCrew(id, _) | DeleteCrew(id) => format!("crews/{id}"),
            ListEquipmentTypes | CreateEquipmentType(_) => "equipment/types".to_string(),
            UpdateEquipmentType(id, _) | DeleteEquipmentType(id) => format!("equipment/types/{id}"),
            ListEquipment | CreateEquipment(_) => "equipment".to_string(),
            UpdateEquipment(id, _) | DeleteEquipment(id) => format!("equipment/{id}"),
            ListCourses | CreateCourse(_) => "courses".to_string(),
            GetCourse(id) | UpdateCourse(id, _) => format!("courses/{id}"),
            StartCourse(id) => format!("courses/{id}/start"),
            AddCourseMaterial { course_id, .. } => format!("courses/{course_id}/materials"),
            ListCourseModules(course_id) => format!("lessons/modules/{course_id}"),
            CreateModule(_) => "lessons/modules".to_string(),
            UpdateModule(id, _) => format!("lessons/modules/{id}"),
            ListModuleLessons(module_id) => format!("lessons/module/{module_id}"),
            GetLesson(id) => format!("lessons/{id}"),
            CreateLesson(_) => "lessons/lessons".to_string(),
            UpdateLesson(id, _) => format!("lessons/lessons/{id}"),
            StartLesson(id) => format!("lessons/{id}/start"),
            UpdateLessonTime { lesson_id, .. } => format!("lessons/{lesson_id}/time"),
            CompleteLesson(id) => format!("lessons/{id}/complete"),
            CreateTest(_) => "tests".to_string(),
            GetTest(id) | UpdateTest(id, _) => format!("tests/{id}"),
            SubmitTest(id, _) => format!("tests/{id}/submit"),
            ListKnowledgeCategories | CreateKnowledgeCategory(_) => "knowledge/categories".to_string(),
            ListKnowledgeMaterials(Some(category)) => {
                format!("knowledge/materials?category_id={category}")
            }
            ListKnowledgeMaterials(None) | CreateKnowledgeMaterial(_) => "knowledge/materials".to_string(),
            UpdateKnowledgeMaterial(id, _) => format!("knowledge/materials/{id}"),
            ListPracticeVideos | CreatePracticeVideo(_) => "practice/videos".to_string(),
            CourseAnalytics(id) => format!("analytics/courses/{id}"),
            LearningAnalytics => "analytics/learning".to_string(),
            UserAnalytics(id) => format!("analytics/users/{id}"),
            ListUsers => "admin/users".to_string(),
            GetUser(id) => format!("admin/users/{id}"),
            UpdateUserPassword { user_id, .. } => format!("admin/users/{user_id}/password"),
            UpdateUserRole { user_id, .. } => format!("admin/users/{user_id}/role"),
        }
    }

    /// JSON body for mutating calls; `None` for reads and bodiless actions.
    pub fn body(&self) -> Option<Value> {
        use Operation::*;
        match self {
            Register(v) | Login(v) | CreatePersonnel(v) | CreateCrew(v) | CreateEquipmentType(v)
            | CreateEquipment(v) | CreateCourse(v) | CreateModule(v) | CreateLesson(v)
            | CreateTest(v) | CreateKnowledgeCategory(v) | CreateKnowledgeMaterial(v)
            | CreatePracticeVideo(v) => Some(v.clone()),
            UpdatePersonnel(_, v) | CreatePersonnelAccount(_, v) | UpdateCrew(_, v)
            | UpdateEquipmentType(_, v) | UpdateEquipment(_, v) | UpdateCourse(_, v)
            | UpdateModule(_, v) | UpdateLesson(_, v) | UpdateTest(_, v) | SubmitTest(_, v)
            | UpdateKnowledgeMaterial(_, v) => Some(v.clone()),
            AddCourseMaterial { material_id, .. } => Some(json!({ "material_id": material_id })),
            UpdateLessonTime { seconds, .. } => Some(json!({ "time_on_page_seconds": seconds })),
            UpdateUserPassword { password, .. } => Some(json!({ "password": password })),
            UpdateUserRole { role, .. } => Some(json!({ "role": role })),
            _ => None,
        }
    }
}
