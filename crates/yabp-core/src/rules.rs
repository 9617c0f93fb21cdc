//! Declarative fragment-selection rules.
//!
//! Each row says: for agent `agent`, when `when` holds over the user's
//! selections, include `fragment` (a path relative to the agent directory),
//! optionally under an explicit `title`. Rows are evaluated in declared
//! order, so the table order is the fragment order.
//!
//! The built-in table can be replaced by `<agents>/selection_rules.yaml`:
//!
//! ```yaml
//! rules:
//!   - agent: devops-engineer
//!     fragment: infrastructure/aws_terraform_complete.md
//!     title: AWS Infrastructure (Terraform)
//!     when:
//!       op: all
//!       of:
//!         - { op: equals, section: Cloud Provider, value: AWS }
//!         - { op: includes, section: Infrastructure, value: Terraform }
//! ```

use crate::error::Result;
use crate::paths;
use crate::selection::Selections;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Always,
    /// The section has a non-empty answer.
    Present { section: String },
    /// The section's single answer is exactly `value`.
    Equals { section: String, value: String },
    /// `value` is among the section's answers (scalar = set of one).
    Includes { section: String, value: String },
    All { of: Vec<Condition> },
    Any { of: Vec<Condition> },
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Always
    }
}

impl Condition {
    pub fn matches(&self, selections: &Selections) -> bool {
        match self {
            Condition::Always => true,
            Condition::Present { section } => selections.is_present(section),
            Condition::Equals { section, value } => selections.equals(section, value),
            Condition::Includes { section, value } => selections.includes(section, value),
            Condition::All { of } => of.iter().all(|c| c.matches(selections)),
            Condition::Any { of } => of.iter().any(|c| c.matches(selections)),
        }
    }
}

// ---------------------------------------------------------------------------
// SelectionRule / RuleSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRule {
    pub agent: String,
    #[serde(default)]
    pub when: Condition,
    pub fragment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<SelectionRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl RuleSet {
    pub fn new(rules: Vec<SelectionRule>) -> Self {
        Self { rules }
    }

    /// Rules for `agent`, in declared order.
    pub fn for_agent<'a>(&'a self, agent: &'a str) -> impl Iterator<Item = &'a SelectionRule> {
        self.rules.iter().filter(move |r| r.agent == agent)
    }

    /// `<agents>/selection_rules.yaml` if present, else the built-in table.
    pub fn load(agents_dir: &Path) -> Result<Self> {
        let path = agents_dir.join(paths::RULES_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let set: RuleSet = serde_yaml::from_str(&data)?;
        tracing::debug!(path = %path.display(), rules = set.rules.len(), "loaded selection rules");
        Ok(set)
    }
}

// ---------------------------------------------------------------------------
// Condition helpers
// ---------------------------------------------------------------------------

fn present(section: &str) -> Condition {
    Condition::Present {
        section: section.to_string(),
    }
}

fn equals(section: &str, value: &str) -> Condition {
    Condition::Equals {
        section: section.to_string(),
        value: value.to_string(),
    }
}

fn includes(section: &str, value: &str) -> Condition {
    Condition::Includes {
        section: section.to_string(),
        value: value.to_string(),
    }
}

fn all(of: Vec<Condition>) -> Condition {
    Condition::All { of }
}

fn any(of: Vec<Condition>) -> Condition {
    Condition::Any { of }
}

macro_rules! rule {
    ($agent:expr, $when:expr, $fragment:expr, $title:expr) => {
        SelectionRule {
            agent: $agent.to_string(),
            when: $when,
            fragment: $fragment.to_string(),
            title: Some($title.to_string()),
        }
    };
}

// Section names used by the built-in agents.
const CLOUD: &str = "Cloud Provider";
const INFRA: &str = "Infrastructure";
const CICD: &str = "CI/CD Platform";
const MONITORING: &str = "Monitoring Stack";
const JAVA: &str = "Java Framework";
const PROJECT_ARTIFACTS: &str = "Project Artifacts";
const ARCH_ARTIFACTS: &str = "Architecture Artifacts";
const FRONTEND: &str = "Frontend Library";
const BACKEND: &str = "Backend Framework";
const TESTING: &str = "Testing Framework";
const PERFORMANCE: &str = "Performance Tools";

// ---------------------------------------------------------------------------
// Default rules (declaration order = fragment order)
// ---------------------------------------------------------------------------

#[rustfmt::skip]
pub fn default_rules() -> Vec<SelectionRule> {
    let mut rules = Vec::new();

    // Project manager
    let pm = "pm-framework";
    rules.extend([
        rule!(pm, includes(PROJECT_ARTIFACTS, "Project briefing"),
            "prompts/spec_00X_project_briefing.md", "Project Briefing"),
        rule!(pm, includes(PROJECT_ARTIFACTS, "User stories"),
            "prompts/spec_002_user_stories.md", "User Stories"),
        rule!(pm, includes(PROJECT_ARTIFACTS, "Roadmap"),
            "prompts/spec_003_roadmap.md", "Project Roadmap"),
    ]);

    // Senior architect
    let arch = "senior-architect";
    rules.extend([
        rule!(arch, includes(ARCH_ARTIFACTS, "System Architecture Diagram"),
            "prompts/001_system_architecture.md", "System Architecture"),
        rule!(arch, includes(ARCH_ARTIFACTS, "Component Diagram"),
            "prompts/002_component_design.md", "Component Architecture"),
        rule!(arch, includes(ARCH_ARTIFACTS, "Deployment Architecture"),
            "prompts/003_deployment_architecture.md", "Deployment Architecture"),
        rule!(arch, includes(ARCH_ARTIFACTS, "Architecture Decision Records (ADRs)"),
            "prompts/005_architecture_decisions.md", "ADRs"),
    ]);

    // Java microservice
    let java = "java-microservice";
    rules.extend([
        rule!(java, Condition::Always,
            "prompts/001_initial_structure.md", "Initial Project Structure"),
        rule!(java, equals(JAVA, "Spring Boot"),
            "framework/spring_boot_microservice.md", "Spring Boot Microservice"),
        rule!(java, equals(JAVA, "Quarkus"),
            "framework/quarkus_reactive.md", "Quarkus Reactive"),
        rule!(java, equals(JAVA, "Micronaut"),
            "framework/micronaut_native.md", "Micronaut Native"),
    ]);

    // DevOps engineer
    let devops = "devops-engineer";
    rules.extend([
        rule!(devops, present(CICD),
            "prompts/001_cicd_pipeline.md", "Base CI/CD Pipeline"),
        rule!(devops, all(vec![equals(CLOUD, "AWS"), includes(INFRA, "Terraform")]),
            "infrastructure/aws_terraform_complete.md", "AWS Infrastructure (Terraform)"),
        rule!(devops, all(vec![equals(CLOUD, "AWS"), includes(INFRA, "CloudFormation")]),
            "infrastructure/aws_cloudformation_vpc.md", "AWS Infrastructure (CloudFormation)"),
        rule!(devops, equals(CLOUD, "AWS"),
            "infrastructure/aws_cdk_typescript.md", "AWS Infrastructure (CDK)"),
        rule!(devops, equals(CLOUD, "Azure"),
            "infrastructure/azure_bicep_aks.md", "Azure Infrastructure (Bicep)"),
        rule!(devops, equals(CLOUD, "GCP"),
            "infrastructure/gcp_terraform_gke.md", "GCP Infrastructure (Terraform)"),
        rule!(devops, all(vec![equals(CICD, "GitHub Actions"), equals(CLOUD, "AWS")]),
            "cicd/github_actions_aws_ecs.md", "GitHub Actions (AWS Deployment)"),
        rule!(devops, equals(CICD, "GitLab CI"),
            "cicd/gitlab_ci_kubernetes.md", "GitLab CI (Kubernetes)"),
        rule!(devops, equals(CICD, "Jenkins"),
            "cicd/jenkins_pipeline_multicloud.md", "Jenkins Pipeline"),
        rule!(devops, present(MONITORING),
            "monitoring/prometheus_grafana_kubernetes.md", "Prometheus & Grafana"),
        rule!(devops, all(vec![present(MONITORING), equals(CLOUD, "AWS")]),
            "monitoring/cloudwatch_aws.md", "AWS CloudWatch"),
    ]);

    // Python developer
    let py = "python-developer";
    rules.extend([
        rule!(py, equals(BACKEND, "Django"),
            "framework/django_project_structure.md", "Django Project Structure"),
        rule!(py, equals(BACKEND, "Django"),
            "framework/django_rest_api.md", "Django REST Framework API"),
        rule!(py, equals(BACKEND, "FastAPI"),
            "framework/fastapi_project_structure.md", "FastAPI Project Structure"),
        rule!(py, equals(BACKEND, "Flask"),
            "framework/flask_api_blueprint.md", "Flask Application Factory"),
    ]);

    // Node.js developer
    let node = "nodejs-developer";
    rules.extend([
        rule!(node, equals(BACKEND, "Express"),
            "framework/express_typescript_setup.md", "Express Setup (TypeScript)"),
        rule!(node, equals(BACKEND, "Express"),
            "framework/express_api_routes.md", "Express API Routes"),
        rule!(node, equals(BACKEND, "NestJS"),
            "framework/nestjs_project_structure.md", "NestJS Project Structure"),
        rule!(node, equals(BACKEND, "Fastify"),
            "framework/fastify_high_performance.md", "Fastify High Performance API"),
    ]);

    // Go developer
    let go = "go-developer";
    rules.extend([
        rule!(go, equals(BACKEND, "Gin"), "framework/gin_api.md", "Gin Web Framework"),
        rule!(go, equals(BACKEND, "Echo"), "framework/echo_api.md", "Echo Framework"),
    ]);

    // Frontend developer: a library pick or a matching framework answer.
    let fe = "frontend-developer";
    let react = || any(vec![includes(FRONTEND, "React"), equals(BACKEND, "React")]);
    let vue = || any(vec![includes(FRONTEND, "Vue"), equals(BACKEND, "Vue")]);
    let angular = || any(vec![includes(FRONTEND, "Angular"), equals(BACKEND, "Angular")]);
    rules.extend([
        rule!(fe, react(), "framework/react_nextjs_app_router.md", "Next.js App Router"),
        rule!(fe, react(), "framework/react_component_library.md", "React Component Library"),
        rule!(fe, react(), "state/react_state_zustand.md", "State Management (Zustand)"),
        rule!(fe, vue(), "framework/vue3_composition_api.md", "Vue 3 Composition API"),
        rule!(fe, vue(), "framework/vue3_component_library.md", "Vue 3 Component Library"),
        rule!(fe, vue(), "state/vue3_pinia_state.md", "State Management (Pinia)"),
        rule!(fe, angular(),
            "framework/angular_standalone_components.md", "Angular Standalone Components"),
        rule!(fe, angular(), "state/angular_ngrx_state.md", "State Management (NgRx)"),
    ]);

    // QA engineer
    let qa = "qa-engineer";
    rules.extend([
        rule!(qa, includes(TESTING, "Playwright"),
            "testing/playwright_e2e_setup.md", "Playwright E2E Setup"),
        rule!(qa, includes(TESTING, "Cypress"),
            "testing/cypress_e2e_setup.md", "Cypress E2E Setup"),
        rule!(qa, includes(PERFORMANCE, "k6"),
            "performance/k6_load_testing.md", "k6 Load Testing"),
    ]);

    rules
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fragments_for(set: &RuleSet, agent: &str, s: &Selections) -> Vec<String> {
        set.for_agent(agent)
            .filter(|r| r.when.matches(s))
            .map(|r| r.fragment.clone())
            .collect()
    }

    #[test]
    fn layered_rule_needs_both_conditions() {
        let set = RuleSet::default();
        let aws_only = Selections::new().with(CLOUD, "AWS");
        let frags = fragments_for(&set, "devops-engineer", &aws_only);
        assert_eq!(frags, vec!["infrastructure/aws_cdk_typescript.md"]);

        let aws_tf = aws_only.with(INFRA, vec!["Terraform"]);
        let frags = fragments_for(&set, "devops-engineer", &aws_tf);
        assert_eq!(
            frags,
            vec![
                "infrastructure/aws_terraform_complete.md",
                "infrastructure/aws_cdk_typescript.md"
            ]
        );
    }

    #[test]
    fn any_condition_for_frontend() {
        let set = RuleSet::default();
        let by_lib = Selections::new().with(FRONTEND, vec!["Vue", "React"]);
        let by_framework = Selections::new().with(BACKEND, "React");
        assert_eq!(fragments_for(&set, "frontend-developer", &by_lib).len(), 6);
        assert_eq!(fragments_for(&set, "frontend-developer", &by_framework).len(), 3);
    }

    #[test]
    fn unmatched_selections_add_nothing() {
        let set = RuleSet::default();
        let s = Selections::new().with(CLOUD, "Oracle").with("Unrelated", "x");
        assert!(fragments_for(&set, "devops-engineer", &s).is_empty());
        assert!(fragments_for(&set, "unknown-agent", &s).is_empty());
    }

    #[test]
    fn every_default_rule_has_a_title() {
        assert!(default_rules().iter().all(|r| r.title.is_some()));
    }

    #[test]
    fn yaml_rule_file_replaces_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(paths::RULES_FILE),
            r#"
rules:
  - agent: data-engineer
    fragment: pipelines/airflow.md
    when:
      op: all
      of:
        - { op: equals, section: Orchestrator, value: Airflow }
        - { op: present, section: Warehouse }
  - agent: data-engineer
    fragment: prompts/base.md
"#,
        )
        .unwrap();
        let set = RuleSet::load(dir.path()).unwrap();
        assert_eq!(set.rules.len(), 2);
        assert_eq!(set.rules[1].when, Condition::Always);
        assert_eq!(set.rules[1].title, None);

        let s = Selections::new()
            .with("Orchestrator", "Airflow")
            .with("Warehouse", "Snowflake");
        assert_eq!(
            fragments_for(&set, "data-engineer", &s),
            vec!["pipelines/airflow.md", "prompts/base.md"]
        );
    }

    #[test]
    fn missing_rule_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(RuleSet::load(dir.path()).unwrap(), RuleSet::default());
    }
}
