use serde_json::{Value, json};
use tracklet_core::{FilterCriteria, IssueDraft, IssuePatch, timestamp};

use crate::cli::IssueCommands;
use crate::support::{open_label, open_service, parse_filters_or_exit, print_json};

pub fn run(command: IssueCommands) {
    match command {
        IssueCommands::Add {
            title,
            text,
            created_by,
            assigned_to,
            status_text,
            project,
            store,
            json,
        } => run_add(
            title,
            text,
            created_by,
            assigned_to,
            status_text,
            project,
            store,
            json,
        ),

        IssueCommands::List {
            project,
            filters,
            store,
            json,
        } => run_list(project, filters, store, json),

        IssueCommands::Update {
            id,
            title,
            text,
            created_by,
            assigned_to,
            status_text,
            close,
            project,
            store,
            json,
        } => run_update(
            id,
            title,
            text,
            created_by,
            assigned_to,
            status_text,
            close,
            project,
            store,
            json,
        ),

        IssueCommands::Delete {
            id,
            project,
            store,
            json,
        } => run_delete(id, project, store, json),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_add(
    title: String,
    text: String,
    created_by: String,
    assigned_to: String,
    status_text: String,
    project: String,
    store: String,
    json_output: bool,
) {
    let service = open_service(&store);
    let draft = IssueDraft {
        issue_title: Some(title),
        issue_text: Some(text),
        created_by: Some(created_by),
        assigned_to: Some(assigned_to),
        status_text: Some(status_text),
    };

    let issue = service
        .create(&project, draft, timestamp::now_ms())
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        });

    if json_output {
        print_json(&json!({
            "action": "issue.add",
            "storePath": store,
            "project": project,
            "issue": issue,
        }));
    } else {
        println!(
            "tracklet issue add\n  Added: {} [{}]\n  Project: {}\n  Path: {}",
            issue.id,
            open_label(issue.open),
            project,
            store
        );
    }
}

fn run_list(project: String, filters: Vec<String>, store: String, json_output: bool) {
    let service = open_service(&store);
    let criteria = FilterCriteria::from_pairs(parse_filters_or_exit(&filters));

    let issues = service.list(&project, &criteria).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if json_output {
        print_json(&json!({
            "action": "issue.list",
            "storePath": store,
            "project": project,
            "count": issues.len(),
            "issues": issues,
        }));
    } else {
        println!(
            "tracklet issue list\n  Project: {}\n  Path: {}\n  Count: {}",
            project,
            store,
            issues.len()
        );
        for issue in &issues {
            println!(
                "  - {} [{}] {}",
                issue.id,
                open_label(issue.open),
                issue.issue_title
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_update(
    id: String,
    title: Option<String>,
    text: Option<String>,
    created_by: Option<String>,
    assigned_to: Option<String>,
    status_text: Option<String>,
    close: bool,
    project: String,
    store: String,
    json_output: bool,
) {
    let service = open_service(&store);
    let patch = IssuePatch {
        id: Some(id),
        issue_title: title,
        issue_text: text,
        created_by,
        assigned_to,
        status_text,
        open: if close { json!(true) } else { Value::Null },
    };

    let updated = service
        .update(&project, &patch, timestamp::now_ms())
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        });

    if json_output {
        print_json(&json!({
            "action": "issue.update",
            "storePath": store,
            "project": project,
            "result": "successfully updated",
            "_id": updated,
        }));
    } else {
        println!(
            "tracklet issue update\n  Updated: {updated}\n  Project: {project}\n  Path: {store}"
        );
    }
}

fn run_delete(id: String, project: String, store: String, json_output: bool) {
    let service = open_service(&store);
    let patch = IssuePatch {
        id: Some(id),
        ..IssuePatch::default()
    };

    let deleted = service.delete(&project, &patch).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if json_output {
        print_json(&json!({
            "action": "issue.delete",
            "storePath": store,
            "project": project,
            "result": "successfully deleted",
            "_id": deleted,
        }));
    } else {
        println!(
            "tracklet issue delete\n  Deleted: {deleted}\n  Project: {project}\n  Path: {store}"
        );
    }
}
