//! Persona template registry: compiled-in rosters plus runtime-registered
//! custom ones. Builtins always win on id collision.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use super::types::{SageTemplate, WiseAgent};
use crate::error::{AppError, AppResult};

/// Default template used when a session names neither template nor theme.
pub const DEFAULT_TEMPLATE_ID: &str = "magi";

/// Two-tier template registry.
///
/// Resolution checks the builtin tier first, then the custom tier, so a
/// custom template can never shadow a builtin.
pub struct TemplateRegistry {
    builtin: Vec<SageTemplate>,
    custom: RwLock<HashMap<String, SageTemplate>>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    /// Create a registry holding the builtin rosters.
    pub fn new() -> Self {
        Self {
            builtin: builtin_templates(),
            custom: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a template by id, builtin tier first.
    pub fn find(&self, id: &str) -> Option<SageTemplate> {
        if let Some(t) = self.builtin.iter().find(|t| t.id == id) {
            return Some(t.clone());
        }
        self.custom
            .read()
            .ok()
            .and_then(|m| m.get(id).cloned())
    }

    /// Resolve a theme keyword to a builtin template id.
    pub fn resolve_theme(&self, theme: &str) -> Option<String> {
        let id = match theme.to_lowercase().as_str() {
            "classic" | "eva" | "magi" => "magi",
            "philosophy" | "philosophers" => "philosophers",
            "business" | "executives" => "executives",
            _ => return None,
        };
        Some(id.to_string())
    }

    /// Register a custom template.
    ///
    /// Rejects ids that collide with a builtin; re-registering a custom id
    /// replaces the previous roster.
    pub fn register(&self, template: SageTemplate) -> AppResult<()> {
        if template.agents.is_empty() {
            return Err(AppError::validation(
                "agents",
                "A template needs at least one agent",
            ));
        }
        if self.builtin.iter().any(|t| t.id == template.id) {
            return Err(AppError::validation(
                "id",
                format!("'{}' is a builtin template id", template.id),
            ));
        }
        let mut custom = self.custom.write().map_err(|_| AppError::Internal {
            message: "Template registry lock poisoned".to_string(),
        })?;
        debug!(template_id = %template.id, "Custom template registered");
        custom.insert(template.id.clone(), template);
        Ok(())
    }

    /// All templates: builtins first, then custom in arbitrary order.
    pub fn list(&self) -> Vec<SageTemplate> {
        let mut all = self.builtin.clone();
        if let Ok(custom) = self.custom.read() {
            all.extend(custom.values().cloned());
        }
        all
    }
}

fn builtin_templates() -> Vec<SageTemplate> {
    vec![magi_template(), philosophers_template(), executives_template()]
}

fn magi_template() -> SageTemplate {
    SageTemplate {
        id: "magi".to_string(),
        name: "MAGI".to_string(),
        description: "Three-way scientist / strategist / humanist deliberation".to_string(),
        agents: vec![
            WiseAgent::new(
                "melchior",
                "Melchior",
                "The scientist: judge the proposal on evidence, feasibility and technical soundness.",
                "Precise and skeptical; demands data before agreement.",
            ),
            WiseAgent::new(
                "balthasar",
                "Balthasar",
                "The strategist: judge the proposal on long-term consequences, risks and second-order effects.",
                "Calm and calculating; thinks several moves ahead.",
            ),
            WiseAgent::new(
                "casper",
                "Casper",
                "The humanist: judge the proposal on its impact on people, ethics and lived experience.",
                "Warm but firm; refuses to trade people for efficiency.",
            ),
        ],
    }
}

fn philosophers_template() -> SageTemplate {
    SageTemplate {
        id: "philosophers".to_string(),
        name: "Philosophers".to_string(),
        description: "Rationalist / empiricist / pragmatist epistemic triangle".to_string(),
        agents: vec![
            WiseAgent::new(
                "rationalist",
                "The Rationalist",
                "Argue from first principles and logical necessity; distrust anecdote.",
                "Rigorous and abstract; follows arguments wherever they lead.",
            ),
            WiseAgent::new(
                "empiricist",
                "The Empiricist",
                "Argue from observation and evidence; distrust untested theory.",
                "Concrete and cautious; asks what has actually been measured.",
            ),
            WiseAgent::new(
                "pragmatist",
                "The Pragmatist",
                "Argue from consequences; the right answer is the one that works in practice.",
                "Practical and impatient with hair-splitting.",
            ),
        ],
    }
}

fn executives_template() -> SageTemplate {
    SageTemplate {
        id: "executives".to_string(),
        name: "Executives".to_string(),
        description: "Product / engineering / finance leadership review".to_string(),
        agents: vec![
            WiseAgent::new(
                "cpo",
                "Head of Product",
                "Judge the proposal on user value, differentiation and market timing.",
                "Opinionated and user-obsessed.",
            ),
            WiseAgent::new(
                "cto",
                "Head of Engineering",
                "Judge the proposal on technical cost, maintainability and team capacity.",
                "Blunt about complexity and hidden costs.",
            ),
            WiseAgent::new(
                "cfo",
                "Head of Finance",
                "Judge the proposal on cost, return and downside exposure.",
                "Conservative; wants the numbers to close.",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_resolve() {
        let registry = TemplateRegistry::new();
        for id in ["magi", "philosophers", "executives"] {
            let t = registry.find(id).unwrap();
            assert_eq!(t.id, id);
            assert_eq!(t.agents.len(), 3);
        }
    }

    #[test]
    fn test_theme_resolution() {
        let registry = TemplateRegistry::new();
        assert_eq!(registry.resolve_theme("eva").as_deref(), Some("magi"));
        assert_eq!(registry.resolve_theme("CLASSIC").as_deref(), Some("magi"));
        assert_eq!(
            registry.resolve_theme("philosophy").as_deref(),
            Some("philosophers")
        );
        assert_eq!(
            registry.resolve_theme("business").as_deref(),
            Some("executives")
        );
        assert!(registry.resolve_theme("unknown").is_none());
    }

    #[test]
    fn test_register_rejects_builtin_collision() {
        let registry = TemplateRegistry::new();
        let template = SageTemplate {
            id: "magi".to_string(),
            name: "Impostor".to_string(),
            description: String::new(),
            agents: vec![WiseAgent::new("x", "X", "p", "p")],
        };
        assert!(registry.register(template).is_err());
        // The builtin roster is untouched.
        assert_eq!(registry.find("magi").unwrap().name, "MAGI");
    }

    #[test]
    fn test_register_and_replace_custom() {
        let registry = TemplateRegistry::new();
        let mut template = SageTemplate {
            id: "custom".to_string(),
            name: "First".to_string(),
            description: String::new(),
            agents: vec![WiseAgent::new("x", "X", "p", "p")],
        };
        registry.register(template.clone()).unwrap();
        assert_eq!(registry.find("custom").unwrap().name, "First");

        template.name = "Second".to_string();
        registry.register(template).unwrap();
        assert_eq!(registry.find("custom").unwrap().name, "Second");
    }

    #[test]
    fn test_register_rejects_empty_roster() {
        let registry = TemplateRegistry::new();
        let template = SageTemplate {
            id: "empty".to_string(),
            name: "Empty".to_string(),
            description: String::new(),
            agents: vec![],
        };
        assert!(registry.register(template).is_err());
    }

    #[test]
    fn test_list_contains_builtins_and_custom() {
        let registry = TemplateRegistry::new();
        registry
            .register(SageTemplate {
                id: "extra".to_string(),
                name: "Extra".to_string(),
                description: String::new(),
                agents: vec![WiseAgent::new("x", "X", "p", "p")],
            })
            .unwrap();
        let list = registry.list();
        assert_eq!(list.len(), 4);
        assert_eq!(list[0].id, "magi");
    }
}
