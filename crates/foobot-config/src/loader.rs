use crate::error::{ConfigError, Result};
use crate::settings::AppConfig;
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

/// 环境变量前缀，例如 `FOOBOT__API_KEY`
pub const ENV_PREFIX: &str = "FOOBOT";

/// 前缀与嵌套键的分隔符，例如 `FOOBOT__LOGGING__LEVEL`
pub const ENV_SEPARATOR: &str = "__";

/// 配置加载器
pub struct ConfigLoader {
    path: PathBuf,
    use_env: bool,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            use_env: true,
        }
    }

    /// 不读取环境变量（测试用）
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 加载并验证配置
    ///
    /// 文件不存在时只使用环境变量；两者都没有提供 `api_key` 时报错。
    pub fn load(&self) -> Result<AppConfig> {
        let config = self.load_unchecked()?;
        config.validate()?;
        Ok(config)
    }

    /// 加载但不验证
    pub fn load_unchecked(&self) -> Result<AppConfig> {
        let mut builder = Config::builder();

        if self.path.exists() {
            let path = self
                .path
                .to_str()
                .ok_or_else(|| ConfigError::invalid("config path is not valid UTF-8"))?;
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        } else if !self.use_env {
            return Err(ConfigError::NotFound(self.path.display().to_string()));
        }

        if self.use_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// 从 TOML 字符串加载（不读取环境变量）
    pub fn from_toml_str(content: &str) -> Result<AppConfig> {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
