use crate::api::{connect, Mode};
use crate::commands::{table, Out};
use crate::error::{ErrorType, IntoResult};
use crate::nav::{quick_links_for, sidebar, NavEntry, QuickLink, Role};
use crate::{Config, Result};
use serde::Serialize;

/// What a role sees in the portal's navigation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub role: String,
    pub entries: Vec<NavEntry>,
    pub quick_links: Vec<QuickLink>,
}

/// Shows the sidebar entries and quick links visible to `role`.
pub async fn nav(config: Config, mode: Mode, role: Role) -> Result<Out<Navigation>> {
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let links = portal.quick_links().await.pub_result(ErrorType::Request)?;

    let navigation = Navigation {
        role: role.to_string(),
        entries: sidebar(&role).into_iter().cloned().collect(),
        quick_links: quick_links_for(&links, &role).into_iter().cloned().collect(),
    };

    let entries: Vec<Vec<String>> = navigation
        .entries
        .iter()
        .map(|e| vec![e.label.to_string(), e.path.to_string()])
        .collect();
    let links: Vec<Vec<String>> = navigation
        .quick_links
        .iter()
        .map(|l| vec![l.title.clone(), l.url.clone()])
        .collect();
    let message = format!(
        "Navigation for role '{role}'{}\n{}\n\nQuick links\n{}",
        if role.is_admin() { " (admin)" } else { "" },
        table(&["Page", "Path"], &entries),
        table(&["Title", "URL"], &links)
    );
    Ok(Out::new(message, navigation))
}
