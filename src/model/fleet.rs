//! Cars, clients and portal users.

use serde::{Deserialize, Serialize};

/// A car in the fleet.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub license_plate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default)]
    pub status: String,
    /// The client who owns the car, for cars managed on behalf of an owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl Car {
    /// A short human label, e.g. `2021 Tesla Model 3 (8ABC123)`.
    pub fn label(&self) -> String {
        if self.license_plate.is_empty() {
            format!("{} {} {}", self.year, self.make, self.model)
        } else {
            format!(
                "{} {} {} ({})",
                self.year, self.make, self.model, self.license_plate
            )
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// An employee or administrator account on the portal.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// The name of the user's role, see `nav::Role`.
    pub role: String,
    #[serde(default = "active")]
    pub is_active: bool,
}

fn active() -> bool {
    true
}
