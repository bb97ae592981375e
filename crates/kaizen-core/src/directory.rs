//! Employee and plant master data.
//!
//! The engine only needs to resolve references, so both sources sit behind
//! small traits. `Directory` is the bundled YAML-backed implementation read
//! from `.kaizen/directory.yaml`.

use crate::error::{KaizenError, Result};
use crate::io;
use crate::paths;
use crate::types::Role;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub employee_code: String,
    pub name: String,
    pub email: String,
    /// Plant name the employee works at.
    #[serde(default)]
    pub plant: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Employee {
    pub fn to_ref(&self) -> EmployeeRef {
        EmployeeRef {
            id: self.id.clone(),
            employee_code: self.employee_code.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    pub fn works_at(&self, plant: &Plant) -> bool {
        self.plant.trim().eq_ignore_ascii_case(plant.name.trim())
    }
}

/// Snapshot of an employee embedded in an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRef {
    pub id: String,
    pub employee_code: String,
    pub name: String,
    pub email: String,
}

/// Employees holding approval duties at a plant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantRoles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci_head: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hod: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lof: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cs_head: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci_team: Option<String>,
}

impl PlantRoles {
    /// Employee id occupying the slot for `role`, if any.
    pub fn holder(&self, role: Role) -> Option<&str> {
        match role {
            Role::CiHead => self.ci_head.as_deref(),
            Role::Hod => self.hod.as_deref(),
            Role::Lof => self.lof.as_deref(),
            Role::CsHead => self.cs_head.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub plant_code: String,
    #[serde(default)]
    pub roles: PlantRoles,
}

impl Plant {
    pub fn to_ref(&self) -> PlantRef {
        PlantRef {
            id: self.id.clone(),
            name: self.name.clone(),
            plant_code: self.plant_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub plant_code: String,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait EmployeeDirectory: Send + Sync {
    fn employee(&self, id: &str) -> Result<Employee>;
    fn employee_by_code(&self, code: &str) -> Result<Employee>;
    /// Active administrators; notification recipients for most events.
    fn administrators(&self) -> Result<Vec<Employee>>;
}

pub trait PlantDirectory: Send + Sync {
    fn plant(&self, id: &str) -> Result<Plant>;
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub plants: Vec<Plant>,
}

impl Directory {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::directory_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&paths::directory_path(root), data.as_bytes())
    }

    pub fn with_employee(mut self, employee: Employee) -> Self {
        self.employees.retain(|e| e.id != employee.id);
        self.employees.push(employee);
        self
    }

    pub fn with_plant(mut self, plant: Plant) -> Self {
        self.plants.retain(|p| p.id != plant.id);
        self.plants.push(plant);
        self
    }
}

impl EmployeeDirectory for Directory {
    fn employee(&self, id: &str) -> Result<Employee> {
        self.employees
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| KaizenError::EmployeeNotFound(id.to_string()))
    }

    fn employee_by_code(&self, code: &str) -> Result<Employee> {
        self.employees
            .iter()
            .find(|e| e.employee_code == code)
            .cloned()
            .ok_or_else(|| KaizenError::EmployeeNotFound(code.to_string()))
    }

    fn administrators(&self) -> Result<Vec<Employee>> {
        Ok(self
            .employees
            .iter()
            .filter(|e| e.role == Role::Admin && e.is_active)
            .cloned()
            .collect())
    }
}

impl PlantDirectory for Directory {
    fn plant(&self, id: &str) -> Result<Plant> {
        self.plants
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| KaizenError::PlantNotFound(id.to_string()))
    }
}
