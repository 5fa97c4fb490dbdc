//! 配置管理

use crate::error::{ErrorContext, ReportifyError, ReportifyResult};
use crate::types::ReportifyConfig;

use std::path::Path;

impl Default for ReportifyConfig {
    fn default() -> Self {
        Self {
            llm: crate::types::LlmConfig {
                provider: "deepseek".to_string(),
                model: "deepseek-chat".to_string(),
                api_key: None,
                base_url: None,
                temperature: 0.0,
                max_tokens: Some(4000),
            },
            search: crate::types::SearchConfig {
                endpoint: "http://localhost:8080/search".to_string(),
                timeout_secs: 10,
                max_results: 5,
            },
            store: crate::types::StoreConfig {
                persist_dir: std::path::PathBuf::from("./chroma_db"),
                collection: "documents".to_string(),
            },
            generation: crate::types::GenerationConfig {
                max_questions_per_section: None,
                max_sections: None,
                fetch_top_n: 1,
                knowledge_base_top_k: 3,
            },
            ingest: crate::types::IngestConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
            },
        }
    }
}

impl ReportifyConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> ReportifyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ReportifyError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: ReportifyConfig =
            toml::from_str(&content).map_err(|e| ReportifyError::Config {
                message: format!("Failed to parse config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("parse_toml")
                    .with_suggestion("Check TOML syntax in config file"),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ReportifyResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ReportifyError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| ReportifyError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// 验证配置
    pub fn validate(&self) -> ReportifyResult<()> {
        if self.search.timeout_secs == 0 {
            return Err(ReportifyError::Config {
                message: "search.timeout_secs must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set search.timeout_secs to a positive value"),
            });
        }

        if self.generation.fetch_top_n == 0 {
            return Err(ReportifyError::Config {
                message: "generation.fetch_top_n must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set generation.fetch_top_n to a positive value"),
            });
        }

        if self.ingest.chunk_size == 0 {
            return Err(ReportifyError::Config {
                message: "ingest.chunk_size must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set ingest.chunk_size to a positive value"),
            });
        }

        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(ReportifyError::Config {
                message: "ingest.chunk_overlap must be smaller than ingest.chunk_size".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Reduce ingest.chunk_overlap below ingest.chunk_size"),
            });
        }

        Ok(())
    }
}
