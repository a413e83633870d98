//! The car, client and user lists.

use crate::api::{connect, Mode};
use crate::commands::{table, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Car, Client, User};
use crate::{Config, Result};

/// Lists the cars in the fleet.
pub async fn cars(config: Config, mode: Mode) -> Result<Out<Vec<Car>>> {
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let cars = portal.cars().await.pub_result(ErrorType::Request)?;
    let rows: Vec<Vec<String>> = cars
        .iter()
        .map(|c| {
            vec![
                c.id.clone(),
                c.label(),
                c.status.clone(),
                c.owner_id.clone().unwrap_or_default(),
            ]
        })
        .collect();
    let message = format!(
        "{} car{}\n{}",
        cars.len(),
        plural(cars.len()),
        table(&["ID", "Car", "Status", "Owner"], &rows)
    );
    Ok(Out::new(message, cars))
}

pub async fn clients(config: Config, mode: Mode) -> Result<Out<Vec<Client>>> {
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let clients = portal.clients().await.pub_result(ErrorType::Request)?;
    let rows: Vec<Vec<String>> = clients
        .iter()
        .map(|c| vec![c.id.clone(), c.full_name(), c.email.clone(), c.phone.clone()])
        .collect();
    let message = format!(
        "{} client{}\n{}",
        clients.len(),
        plural(clients.len()),
        table(&["ID", "Name", "Email", "Phone"], &rows)
    );
    Ok(Out::new(message, clients))
}

/// Lists the portal's employee and admin accounts.
pub async fn users(config: Config, mode: Mode) -> Result<Out<Vec<User>>> {
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let users = portal.users().await.pub_result(ErrorType::Request)?;
    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|u| {
            vec![
                u.id.clone(),
                u.name.clone(),
                u.email.clone(),
                u.role.clone(),
                if u.is_active { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    let message = format!(
        "{} user{}\n{}",
        users.len(),
        plural(users.len()),
        table(&["ID", "Name", "Email", "Role", "Active"], &rows)
    );
    Ok(Out::new(message, users))
}

pub(super) fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_cars() {
        let env = TestEnv::new().await;
        let out = cars(env.config(), Mode::Testing).await.unwrap();
        assert_eq!(out.structure().unwrap().len(), 3);
        assert!(out.message().starts_with("3 cars\n| ID"));
        assert!(out.message().contains("2021 Tesla Model 3 (8ABC123)"));
    }

    #[tokio::test]
    async fn test_clients_and_users() {
        let env = TestEnv::new().await;
        let out = clients(env.config(), Mode::Testing).await.unwrap();
        assert!(out.message().contains("Maria Lopez"));
        let out = users(env.config(), Mode::Testing).await.unwrap();
        assert_eq!(out.structure().unwrap()[0].role, "admin");
    }

    #[tokio::test]
    async fn test_request_error_is_tagged() {
        let env = TestEnv::new().await;
        env.state(|s| s.fail_next(401, "Not authenticated"));
        let err = cars(env.config(), Mode::Testing).await.unwrap_err();
        assert_eq!(err.to_string(), "Request error");
        assert!(format!("{err:#}").contains("Not authenticated"));
    }
}
