//! Global constants used throughout the seedmap codebase.
//!
//! Placeholder tokens, file suffixes and default durations that several modules
//! need to agree on live here.

/// Token inside a rendered document where merged fragment bodies are injected.
pub const EXT_MAPPER_PLACEHOLDER: &str = "<!--_ext_mapper_-->";

/// Token inside a dialect template replaced by the global template text.
pub const GLOBAL_TEMPLATE_PLACEHOLDER: &str = "<!--_global_tpl_-->";

/// Suffix of mapping documents and fragments.
pub const XML_SUFFIX: &str = ".xml";

/// Suffix of dialect templates.
pub const TEMPLATE_SUFFIX: &str = ".tera";

/// Root element of every mapping document.
pub const NODE_MAPPER: &str = "mapper";

/// Root element attribute holding the namespace.
pub const ATTR_NAMESPACE: &str = "namespace";

/// Default name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "seedmap.toml";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "SEEDMAP_CONFIG";

/// Default location of the model file.
pub const DEFAULT_MODEL_PATH: &str = "model.toml";

/// Default location of the shared fragment appended after every build.
pub const DEFAULT_COMMON_SQL_PATH: &str = "seedmap/commonSql.xml";

/// Prefix of "already loaded" markers recorded per namespace.
pub const LOADED_NAMESPACE_PREFIX: &str = "namespace:";

/// Statement id suffix used for `<selectKey>` key generators.
pub const SELECT_KEY_SUFFIX: &str = "!selectKey";

/// Lookup statement used by associations.
pub const ASSOCIATION_SELECT: &str = "getById";

/// Lookup statement used by associations that ignore logic delete.
pub const ASSOCIATION_FORCE_SELECT: &str = "forceById";

/// Document used when a mapper has no concrete entity type.
pub const EMPTY_MAPPER_DOCUMENT: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"utf-8\"?>",
    "<!DOCTYPE mapper PUBLIC \"-//mybatis.org//DTD Mapper 3.0//EN\" \"http://mybatis.org/dtd/mybatis-3-mapper.dtd\">",
    "<mapper namespace=\"{namespace}\"> ",
    " <!--_ext_mapper_--> ",
    "</mapper>"
);

/// Default debounce window for file change events (300 ms).
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Default interval between file system polls (500 ms).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
