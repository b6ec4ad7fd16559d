//! Access policies for the school API operations.

use std::fmt;
use std::str::FromStr;

use auth::{AccessPolicy, Role};
use error::AppError;

const TEACHER: AccessPolicy = AccessPolicy::any_of(&[Role::Teacher]);
const TEACHER_OR_STUDENT: AccessPolicy = AccessPolicy::any_of(&[Role::Teacher, Role::Student]);
const AUTHENTICATED: AccessPolicy = AccessPolicy::authenticated();
const ADMIN: AccessPolicy = AccessPolicy::admin_only();

/// A protected operation of the school API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateClass,
    CreateSubject,
    CreateHomework,
    GetHomework,
    UpdateHomework,
    UpdateStudent,
    ListClasses,
    GetClass,
    ListStudents,
    GetStudent,
    ListTeachers,
    GetTeacher,
    UpdateTeacher,
    ListParents,
    GetParent,
    GetParentChildren,
    LinkChild,
    UnlinkChild,
    ListSubjects,
    GetSubject,
    ListHomework,
    CreateUser,
    ListUsers,
    CreateStudent,
    CreateTeacher,
    CreateParent,
    CreateQrCode,
}

impl Operation {
    pub const ALL: [Operation; 27] = [
        Operation::CreateClass,
        Operation::CreateSubject,
        Operation::CreateHomework,
        Operation::GetHomework,
        Operation::UpdateHomework,
        Operation::UpdateStudent,
        Operation::ListClasses,
        Operation::GetClass,
        Operation::ListStudents,
        Operation::GetStudent,
        Operation::ListTeachers,
        Operation::GetTeacher,
        Operation::UpdateTeacher,
        Operation::ListParents,
        Operation::GetParent,
        Operation::GetParentChildren,
        Operation::LinkChild,
        Operation::UnlinkChild,
        Operation::ListSubjects,
        Operation::GetSubject,
        Operation::ListHomework,
        Operation::CreateUser,
        Operation::ListUsers,
        Operation::CreateStudent,
        Operation::CreateTeacher,
        Operation::CreateParent,
        Operation::CreateQrCode,
    ];

    /// The static policy guarding this operation.
    pub fn policy(&self) -> AccessPolicy {
        match self {
            Operation::CreateClass | Operation::CreateSubject | Operation::CreateHomework => {
                TEACHER
            }
            Operation::GetHomework | Operation::UpdateHomework | Operation::UpdateStudent => {
                TEACHER_OR_STUDENT
            }
            Operation::ListClasses
            | Operation::GetClass
            | Operation::ListStudents
            | Operation::GetStudent
            | Operation::ListTeachers
            | Operation::GetTeacher
            | Operation::UpdateTeacher
            | Operation::ListParents
            | Operation::GetParent
            | Operation::GetParentChildren
            | Operation::LinkChild
            | Operation::UnlinkChild
            | Operation::ListSubjects
            | Operation::GetSubject
            | Operation::ListHomework => AUTHENTICATED,
            Operation::CreateUser
            | Operation::ListUsers
            | Operation::CreateStudent
            | Operation::CreateTeacher
            | Operation::CreateParent
            | Operation::CreateQrCode => ADMIN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateClass => "create-class",
            Operation::CreateSubject => "create-subject",
            Operation::CreateHomework => "create-homework",
            Operation::GetHomework => "get-homework",
            Operation::UpdateHomework => "update-homework",
            Operation::UpdateStudent => "update-student",
            Operation::ListClasses => "list-classes",
            Operation::GetClass => "get-class",
            Operation::ListStudents => "list-students",
            Operation::GetStudent => "get-student",
            Operation::ListTeachers => "list-teachers",
            Operation::GetTeacher => "get-teacher",
            Operation::UpdateTeacher => "update-teacher",
            Operation::ListParents => "list-parents",
            Operation::GetParent => "get-parent",
            Operation::GetParentChildren => "get-parent-children",
            Operation::LinkChild => "link-child",
            Operation::UnlinkChild => "unlink-child",
            Operation::ListSubjects => "list-subjects",
            Operation::GetSubject => "get-subject",
            Operation::ListHomework => "list-homework",
            Operation::CreateUser => "create-user",
            Operation::ListUsers => "list-users",
            Operation::CreateStudent => "create-student",
            Operation::CreateTeacher => "create-teacher",
            Operation::CreateParent => "create-parent",
            Operation::CreateQrCode => "create-qr-code",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| AppError::NotFound(format!("Operation '{s}'")))
    }
}
