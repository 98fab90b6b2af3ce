//! Robots.txt rule matching
//!
//! Matching is delegated to the robotstxt crate; the `Crawl-delay` extension,
//! which that crate ignores, is read here.

use robotstxt::DefaultMatcher;

/// Rules published by a website in its robots.txt
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    /// Raw robots.txt body; `None` allows everything
    content: Option<String>,
}

impl RobotsRules {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    /// Rules used when robots.txt is missing or cannot be fetched
    pub fn allow_all() -> Self {
        Self { content: None }
    }

    fn body(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Checks whether `url` may be fetched by `robot_agent`
    pub fn is_allowed(&self, url: &str, robot_agent: &str) -> bool {
        match self.body() {
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, robot_agent, url)
            }
            None => true,
        }
    }

    /// Returns the `Crawl-delay` in seconds that applies to `robot_agent`
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, robot_agent: &str) -> Option<f64> {
        let body = self.body()?;
        let agent = robot_agent.to_lowercase();

        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut wildcard = None;
        let mut specific = None;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group
                    if in_rules {
                        group.clear();
                        in_rules = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        specific = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        specific.or(wildcard)
    }
}
