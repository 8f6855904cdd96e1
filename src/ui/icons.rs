pub struct Icons;

impl Icons {
    pub const KEY: &str = "🔑";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const DATABASE: &str = "🗄️";
    pub const DEL: &str = "🗑️";
    pub const BROOM: &str = "🧹";
    pub const CLOCK: &str = "⏱️";
    pub const FOLDER: &str = "📁";
}
