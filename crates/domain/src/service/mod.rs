//! Domain services: rules that span more than one aggregate.
//!
//! Services read and write through the persistence ports only. They do not
//! open transactions; callers wrap each method in one unit of work so the
//! "not already assigned" check and the write cannot interleave with another
//! request.

pub mod assignment;
pub mod validation;

pub use assignment::{
    AssignToDepartment, AssignToOrganization, AssignmentService, ChangeDepartment,
    DepartmentChange,
};
pub use validation::UserValidationService;
