//! Kickoff prompt composition.
//!
//! [`generate_prompt`] maps a configuration to an ordered list of sections.
//! It is pure and total: the same input always yields the same sections, and
//! no configuration value can make it fail. The exact wording is load-bearing
//! because users diff and paste the output, so changes here show up in the
//! golden tests below.

use serde::Serialize;

use crate::state::{CiPipeline, ProjectState, RepoMode};

/// How strongly the assistant should treat a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Required,
    Recommended,
    Optional,
}

/// One labeled block of generated prompt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptSection {
    pub heading: String,
    pub content: String,
    pub priority: Priority,
}

impl PromptSection {
    fn new(heading: impl Into<String>, content: impl Into<String>, priority: Priority) -> Self {
        Self {
            heading: heading.into(),
            content: content.into(),
            priority,
        }
    }
}

pub const QUALITY_HEADING: &str = "Quality & Automation";
pub const PACKAGING_HEADING: &str = "Packaging & Publishing";
pub const DOCUMENTATION_HEADING: &str = "Documentation & Compliance";
pub const DEV_ENVIRONMENT_HEADING: &str = "Development Environment & CI/CD";
pub const AGENTS_MD_HEADING: &str = "AGENTS.md Requirements";
pub const REPO_SETUP_HEADING: &str = "Repository Setup";
pub const SECURITY_HEADING: &str = "Security & Advanced";

/// Checklist body of the AGENTS.md section.
pub const AGENTS_MD_CHECKLIST: &str = "Create an AGENTS.md file documenting:
- Project architecture and key design decisions
- Coding agent instructions and context
- Common development workflows and patterns
- Testing strategies and quality standards
- Deployment procedures and environment setup
- Integration patterns and external dependencies";

/// Build the kickoff prompt for `state`.
pub fn generate_prompt(state: &ProjectState) -> Vec<PromptSection> {
    let mut sections = vec![kickoff_section(state), quality_section(state)];
    sections.extend(packaging_section(state));
    sections.push(documentation_section(state));
    sections.extend(dev_environment_section(state));
    if state.documentation.agents_md {
        sections.push(PromptSection::new(
            AGENTS_MD_HEADING,
            AGENTS_MD_CHECKLIST,
            Priority::Recommended,
        ));
    }
    sections.push(repo_setup_section(state));
    sections.push(security_section(state));
    sections
}

/// Render sections as markdown-ish text: `# heading`, body, blank line.
pub fn render_prompt(sections: &[PromptSection]) -> String {
    sections
        .iter()
        .map(|section| format!("# {}\n{}", section.heading, section.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn join_or(items: &[&str], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

fn kickoff_section(state: &ProjectState) -> PromptSection {
    let monorepo = state.repo_mode == RepoMode::Monorepo;
    let project_types = state.display_project_types();

    let heading = if monorepo {
        format!("Kick off: Monorepo ({})", project_types.join(", "))
    } else {
        format!(
            "Kick off: {}",
            project_types.first().copied().unwrap_or("Project")
        )
    };

    let data_stores: Vec<&str> = state.data_stores.iter().map(|s| s.as_str()).collect();
    let content = format!(
        "Context: Building a {} project targeting {}.\n\
         Project Type(s): {}.\n\
         Data Storage: {}.\n\
         Repository Layout: {}.\n\
         Hosting: {}.",
        if monorepo { "monorepo" } else { "single package" },
        state.display_runtime(),
        join_or(&project_types, "none selected"),
        join_or(&data_stores, "none"),
        state.repo_mode,
        state.hosting,
    );

    PromptSection::new(heading, content, Priority::Required)
}

fn quality_section(state: &ProjectState) -> PromptSection {
    let quality = &state.quality;
    PromptSection::new(
        QUALITY_HEADING,
        format!(
            "Linting: {}, Formatting: {}, Testing: {}, CI: {}, Conventional Commits: {}.",
            yes_no(quality.linting),
            yes_no(quality.formatting),
            quality.testing,
            yes_no(quality.ci),
            yes_no(quality.conventional_commits),
        ),
        Priority::Recommended,
    )
}

fn packaging_section(state: &ProjectState) -> Option<PromptSection> {
    let targets = state.packaging.enabled();
    if targets.is_empty() {
        return None;
    }
    Some(PromptSection::new(
        PACKAGING_HEADING,
        format!("Publishing to: {}.", targets.join(", ")),
        Priority::Recommended,
    ))
}

fn documentation_section(state: &ProjectState) -> PromptSection {
    let docs = &state.documentation;
    PromptSection::new(
        DOCUMENTATION_HEADING,
        format!(
            "README: {}, AGENTS.md: {}, License: {}, Changelog: {}, Contributing Guide: {}, Code of Conduct: {}.",
            yes_no(docs.readme),
            yes_no(docs.agents_md),
            docs.license,
            yes_no(docs.changelog),
            yes_no(docs.contributing),
            yes_no(docs.code_of_conduct),
        ),
        Priority::Optional,
    )
}

fn dev_environment_section(state: &ProjectState) -> Option<PromptSection> {
    let env = &state.dev_environment;
    let mut clauses = Vec::new();

    if env.devcontainer {
        clauses.push("Devcontainer configuration for consistent development environment".to_string());
    }
    if env.docker_compose {
        clauses.push("Docker Compose for local service orchestration".to_string());
    }
    if env.ci_pipeline != CiPipeline::None {
        clauses.push(format!(
            "CI Pipeline: {} with build, test, and lint steps",
            env.ci_pipeline
        ));
    }
    if env.cd_pipeline {
        clauses.push(format!(
            "CD Pipeline: Automated deployment to {}",
            state.hosting
        ));
    }

    if clauses.is_empty() {
        return None;
    }
    Some(PromptSection::new(
        DEV_ENVIRONMENT_HEADING,
        clauses.join(".\n"),
        Priority::Recommended,
    ))
}

fn repo_setup_section(state: &ProjectState) -> PromptSection {
    PromptSection::new(
        REPO_SETUP_HEADING,
        format!(
            "Issue Templates: {}, Directory Structure: {}.",
            yes_no(state.repo_setup.issue_templates),
            yes_no(state.repo_setup.dir_structure),
        ),
        Priority::Optional,
    )
}

fn security_section(state: &ProjectState) -> PromptSection {
    PromptSection::new(
        SECURITY_HEADING,
        format!(
            "Secrets Management: {}, Security Scanning: {}.",
            state.advanced.secrets,
            yes_no(state.advanced.security),
        ),
        Priority::Optional,
    )
}
