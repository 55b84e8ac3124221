use std::sync::Arc;

use kkvat_application::{ApiGateway, AuthService, SessionContext};
use kkvat_core::AppResult;
use kkvat_domain::MenuNode;
use kkvat_infrastructure::{FileSessionStore, ReqwestTransport};

use crate::cli::Command;
use crate::console_config::ConsoleConfig;

mod admin;
mod entities;
mod reports;

/// Wires adapters to services and dispatches one CLI command.
pub struct Console {
    config: ConsoleConfig,
    gateway: ApiGateway,
}

impl Console {
    pub async fn connect(config: ConsoleConfig) -> AppResult<Self> {
        let transport = ReqwestTransport::new(&config.api_base_url, config.http_timeout)?;
        let store = FileSessionStore::new(config.session_file.clone());
        let session = SessionContext::new(Arc::new(store));
        session.restore().await?;

        tracing::debug!(
            api_base_url = %config.api_base_url,
            session_file = %config.session_file.display(),
            "console connected"
        );

        Ok(Self {
            gateway: ApiGateway::new(Arc::new(transport), session),
            config,
        })
    }

    pub async fn run(&self, command: Command) -> AppResult<()> {
        match command {
            Command::Login { username, password } => self.login(&username, &password).await,
            Command::Logout => {
                AuthService::new(self.gateway.clone()).logout().await?;
                println!("Signed out.");
                Ok(())
            }
            Command::Whoami => self.whoami().await,
            Command::Menu => self.menu().await,
            Command::Users { action } => admin::users(self, action).await,
            Command::Groups { action } => admin::groups(self, action).await,
            Command::Roles { action } => admin::roles(self, action).await,
            Command::MenuItems { action } => admin::menu_items(self, action).await,
            Command::TestCases { action } => admin::test_cases(self, action).await,
            Command::GroupMembers { action } => admin::group_members(self, action).await,
            Command::RoleMenus { action } => admin::role_menus(self, action).await,
            Command::Entities { action } => entities::run(self, action).await,
            Command::Reports { action } => reports::reports(self, action).await,
            Command::Executions { action } => reports::executions(self, action).await,
            Command::Schedules { action } => reports::schedules(self, action).await,
        }
    }

    fn gateway(&self) -> ApiGateway {
        self.gateway.clone()
    }

    fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    async fn login(&self, username: &str, password: &str) -> AppResult<()> {
        let outcome = AuthService::new(self.gateway())
            .login(username, password)
            .await?;
        let name = outcome
            .user
            .as_ref()
            .map_or_else(|| username.to_owned(), |user| user.display_name());
        println!("Signed in as {name} ({} menu items).", outcome.menus.len());
        Ok(())
    }

    async fn whoami(&self) -> AppResult<()> {
        let auth = AuthService::new(self.gateway());
        if !auth.is_logged_in().await {
            println!("Not signed in.");
            return Ok(());
        }

        match auth.current_user().await {
            Some(user) => println!(
                "{} <{}> role={}",
                user.display_name(),
                user.email.as_deref().unwrap_or("-"),
                user.role.as_deref().unwrap_or("-")
            ),
            None => println!("Signed in (no user details stored)."),
        }
        Ok(())
    }

    async fn menu(&self) -> AppResult<()> {
        let tree = AuthService::new(self.gateway()).menu_tree().await?;
        if tree.is_empty() {
            println!("No menu items.");
        }
        for node in &tree {
            print_menu_node(node, 0);
        }
        Ok(())
    }
}

fn print_menu_node(node: &MenuNode, depth: usize) {
    let route = node.item.route_link.as_deref().unwrap_or("");
    println!("{}{} {route}", "  ".repeat(depth), node.item.label());
    for child in &node.children {
        print_menu_node(child, depth + 1);
    }
}
