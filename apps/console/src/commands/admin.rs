use kkvat_application::{
    ConsoleResource, Groups, ListScreen, ListSnapshot, MenuItems, Roles, SecurityAdminService,
    TestCases, Users,
};
use kkvat_core::AppResult;
use kkvat_domain::{Group, GroupMembership, MenuItem, Role, RoleMenuAssignment, TestCase, User};

use crate::cli::{
    FullListAction, GroupMembersAction, PagedListAction, RoleAction, RoleMenusAction, UserAction,
};

use super::Console;

pub async fn users(console: &Console, action: UserAction) -> AppResult<()> {
    let screen = ListScreen::<Users>::new(console.gateway(), console.config().page_size);
    match action {
        UserAction::List { page } => screen.load(page).await?,
        UserAction::Search { keyword } => screen.search(&keyword).await?,
    }

    print_page(&screen.snapshot().await, format_user);
    Ok(())
}

pub async fn groups(console: &Console, action: PagedListAction) -> AppResult<()> {
    let screen = ListScreen::<Groups>::new(console.gateway(), console.config().page_size);
    let PagedListAction::List { page, search } = action;
    match search {
        Some(keyword) => screen.search(&keyword).await?,
        None => screen.load(page).await?,
    }

    print_page(&screen.snapshot().await, format_group);
    Ok(())
}

pub async fn roles(console: &Console, action: RoleAction) -> AppResult<()> {
    let screen = ListScreen::<Roles>::new(console.gateway(), console.config().page_size);
    let RoleAction::List { search } = action;
    screen.load(0).await?;
    if let Some(keyword) = search {
        screen.search(&keyword).await?;
    }

    print_page(&screen.snapshot().await, format_role);
    Ok(())
}

pub async fn menu_items(console: &Console, action: FullListAction) -> AppResult<()> {
    list_all::<MenuItems>(console, action, format_menu_item).await
}

pub async fn test_cases(console: &Console, action: FullListAction) -> AppResult<()> {
    list_all::<TestCases>(console, action, format_test_case).await
}

pub async fn group_members(console: &Console, action: GroupMembersAction) -> AppResult<()> {
    let service = SecurityAdminService::new(console.gateway());
    match action {
        GroupMembersAction::Show { group_id } => {
            let membership = service.load_group_membership(group_id).await?;
            let users = service.list_assignable_users().await?;
            for user in users {
                let marker = if membership.contains(user.id) { "[x]" } else { "[ ]" };
                println!("{marker} {}", format_user(&user));
            }
        }
        GroupMembersAction::Set { group_id, user_ids } => {
            let membership = GroupMembership::new(group_id, user_ids);
            service.save_group_membership(&membership).await?;
            println!(
                "Group {group_id} now has {} members.",
                membership.user_ids().len()
            );
        }
    }
    Ok(())
}

pub async fn role_menus(console: &Console, action: RoleMenusAction) -> AppResult<()> {
    let service = SecurityAdminService::new(console.gateway());
    match action {
        RoleMenusAction::Show { role_id } => {
            let assignment = service.load_role_assignment(role_id).await?;
            let granted = assignment.menu_item_ids();
            for item in service.list_menu_items().await? {
                let marker = if granted.contains(&item.id) { "[x]" } else { "[ ]" };
                println!("{marker} {}", format_menu_item(&item));
            }
        }
        RoleMenusAction::Set {
            role_id,
            menu_item_ids,
        } => {
            let mut assignment = RoleMenuAssignment::new();
            assignment.select_role(role_id);
            for id in menu_item_ids {
                assignment.set_checked(id, true);
            }
            service.save_role_assignment(&assignment).await?;
            println!(
                "Role {role_id} now grants {} menu items.",
                assignment.menu_item_ids().len()
            );
        }
    }
    Ok(())
}

async fn list_all<R: ConsoleResource>(
    console: &Console,
    action: FullListAction,
    format: fn(&R::Model) -> String,
) -> AppResult<()> {
    let FullListAction::List = action;
    let screen = ListScreen::<R>::new(console.gateway(), console.config().page_size);
    screen.load(0).await?;
    print_page(&screen.snapshot().await, format);
    Ok(())
}

pub(super) fn print_page<T>(snapshot: &ListSnapshot<T>, format: impl Fn(&T) -> String) {
    for row in &snapshot.rows {
        println!("{}", format(row));
    }

    match &snapshot.keyword {
        Some(keyword) => println!(
            "-- {} match(es) for '{keyword}'",
            snapshot.total_elements
        ),
        None if snapshot.total_pages > 1 => println!(
            "-- page {}/{} ({} total)",
            snapshot.page + 1,
            snapshot.total_pages,
            snapshot.total_elements
        ),
        None => println!("-- {} total", snapshot.total_elements),
    }
}

fn active_label(is_active: bool) -> &'static str {
    if is_active { "active" } else { "inactive" }
}

fn format_user(user: &User) -> String {
    format!(
        "#{} {} <{}> {} {}",
        user.id,
        user.username,
        user.email.as_deref().unwrap_or("-"),
        user.role.as_deref().unwrap_or("-"),
        active_label(user.is_active)
    )
}

fn format_group(group: &Group) -> String {
    format!(
        "#{} {} {} {}",
        group.id,
        group.name,
        active_label(group.is_active),
        group.description.as_deref().unwrap_or("")
    )
}

fn format_role(role: &Role) -> String {
    format!(
        "#{} {} {} {}",
        role.id,
        role.name,
        active_label(role.is_active),
        role.description.as_deref().unwrap_or("")
    )
}

fn format_menu_item(item: &MenuItem) -> String {
    format!(
        "#{} {} {} order={}",
        item.id,
        item.label(),
        item.route_link.as_deref().unwrap_or("-"),
        item.menu_order
    )
}

fn format_test_case(test_case: &TestCase) -> String {
    format!(
        "#{} {} [{}] group={}",
        test_case.id,
        test_case.name,
        test_case.status.as_str(),
        test_case.group_name.as_deref().unwrap_or("-")
    )
}
