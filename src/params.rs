/// Per-call prompt and sampling parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatParams {
    /// System instruction text.
    pub system: String,
    /// User message text.
    pub user: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Whether the reply must be a single JSON object.
    pub structured_output: bool,
}

impl ChatParams {
    /// Builds plain-text parameters with temperature `0.0`.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.0,
            structured_output: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Asks the server to constrain its reply to a JSON object.
    pub fn structured(mut self) -> Self {
        self.structured_output = true;
        self
    }
}
