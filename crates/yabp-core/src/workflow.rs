//! Built-in workflow layouts: named phases, each open to a set of agents.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPhase {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub allowed_agents: Vec<String>,
}

impl WorkflowPhase {
    pub fn allows(&self, agent_id: &str) -> bool {
        self.allowed_agents.iter().any(|a| a == agent_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub phases: Vec<WorkflowPhase>,
    pub recommended_agents: Vec<String>,
}

impl WorkflowTemplate {
    /// Ids of the phases an agent may run in, in phase order.
    pub fn phases_for(&self, agent_id: &str) -> Vec<&str> {
        self.phases
            .iter()
            .filter(|p| p.allows(agent_id))
            .map(|p| p.id.as_str())
            .collect()
    }
}

fn phase(id: &str, label: &str, description: &str, agents: &[&str]) -> WorkflowPhase {
    WorkflowPhase {
        id: id.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        allowed_agents: agents.iter().map(|a| a.to_string()).collect(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn templates() -> Vec<WorkflowTemplate> {
    vec![
        WorkflowTemplate {
            id: "comprehensive-sdlc".into(),
            name: "Comprehensive SDLC".into(),
            description: "Full-scale software development lifecycle with dedicated planning, \
                          architecture, implementation, and verification phases."
                .into(),
            phases: vec![
                phase("Inception", "Inception", "Define scope, requirements & user stories",
                    &["pm-framework"]),
                phase("Architecture", "Architecture", "System design & technical specifications",
                    &["senior-architect", "database-specialist"]),
                phase("Implementation", "Implementation", "Code construction & development",
                    &["frontend-developer", "nodejs-developer", "python-developer",
                      "go-developer", "java-specialist"]),
                phase("Operations", "Operations", "Infrastructure & Deployment",
                    &["devops-engineer"]),
                phase("Verification", "Verification", "QA testing & security auditing",
                    &["qa-engineer", "red-blue-team"]),
            ],
            recommended_agents: strings(&[
                "pm-framework",
                "senior-architect",
                "database-specialist",
                "devops-engineer",
                "qa-engineer",
            ]),
        },
        WorkflowTemplate {
            id: "documentation-heavy".into(),
            name: "Documentation Focus".into(),
            description: "Centered on creating thorough technical documentation, \
                          specifications, and project planning artifacts."
                .into(),
            phases: vec![
                phase("Discovery", "Discovery", "Gathering requirements", &["pm-framework"]),
                phase("Specification", "Specification", "Writing technical specs",
                    &["senior-architect", "pm-framework"]),
                phase("Review", "Review", "Review and validation",
                    &["senior-architect", "qa-engineer"]),
            ],
            recommended_agents: strings(&["pm-framework", "senior-architect"]),
        },
        WorkflowTemplate {
            id: "cloud-infrastructure".into(),
            name: "Cloud Infrastructure".into(),
            description: "Streamlined workflow for setting up cloud environments, CI/CD \
                          pipelines, and infrastructure as code."
                .into(),
            phases: vec![
                phase("Planning", "Planning", "Infrastructure requirements",
                    &["senior-architect", "devops-engineer"]),
                phase("IAC-Dev", "IaC Dev", "Terraform/CloudFormation coding",
                    &["devops-engineer"]),
                phase("Security-Audit", "Security", "Security compliance check",
                    &["red-blue-team"]),
            ],
            recommended_agents: strings(&["devops-engineer", "senior-architect", "red-blue-team"]),
        },
        WorkflowTemplate {
            id: "rapid-prototyping".into(),
            name: "Rapid Prototyping".into(),
            description: "Fast-paced workflow focused on quick implementation and feedback loops."
                .into(),
            phases: vec![
                phase("Concept", "Concept", "Quick requirements", &["pm-framework"]),
                phase("Build", "Build", "Rapid development",
                    &["frontend-developer", "nodejs-developer", "python-developer"]),
                phase("Demo", "Demo", "Stakeholder review", &["pm-framework"]),
            ],
            recommended_agents: strings(&["pm-framework", "frontend-developer"]),
        },
    ]
}

pub fn find(id: &str) -> Option<WorkflowTemplate> {
    templates().into_iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_templates_with_unique_ids() {
        let all = templates();
        assert_eq!(all.len(), 4);
        let mut ids: Vec<_> = all.iter().map(|t| t.id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn recommended_agents_have_a_phase() {
        for t in templates() {
            for agent in &t.recommended_agents {
                assert!(!t.phases_for(agent).is_empty(), "{} has no phase for {agent}", t.id);
            }
        }
    }

    #[test]
    fn phases_for_agent_in_order() {
        let t = find("documentation-heavy").unwrap();
        assert_eq!(t.phases_for("senior-architect"), vec!["Specification", "Review"]);
        assert!(find("nope").is_none());
    }

    #[test]
    fn serializes_camel_case() {
        let t = find("cloud-infrastructure").unwrap();
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["phases"][1]["label"], "IaC Dev");
        assert!(json["recommendedAgents"].is_array());
        assert!(json["phases"][0]["allowedAgents"].is_array());
    }
}
