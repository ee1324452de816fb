/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// Every statement uses `IF NOT EXISTS`, so re-running it on each startup is
/// a no-op for an existing database.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `KANDA_DUCKDB_MEMORY`, default `"1GB"`). DuckDB's own default is 80%
/// of system RAM, which is not acceptable for a server process.
///
/// Timestamps are stored as naive UTC `TIMESTAMP` values and read back with
/// `epoch_ms(...)`.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SETTINGS
-- ===========================================
-- Keys stored in this table:
--   'jwt_secret'  – HS256 signing key for admin session cookies
CREATE TABLE IF NOT EXISTS settings (
    key             VARCHAR PRIMARY KEY,
    value           VARCHAR NOT NULL
);

-- ===========================================
-- PAGE VIEWS (one row per pageview event)
-- ===========================================
CREATE TABLE IF NOT EXISTS page_views (
    id                  VARCHAR PRIMARY KEY,       -- UUID v4
    session_id          VARCHAR NOT NULL,
    page                VARCHAR NOT NULL,
    created_at          TIMESTAMP NOT NULL,
    user_agent          VARCHAR,
    referrer            VARCHAR,
    referrer_category   VARCHAR NOT NULL,          -- direct | search | social | email | referral | campaign | internal
    referrer_source     VARCHAR NOT NULL,
    search_keywords     VARCHAR,
    social_platform     VARCHAR,
    social_campaign_id  VARCHAR,

    -- Geo (all nullable, best-effort)
    country             VARCHAR,
    country_code        VARCHAR,
    city                VARCHAR,
    region              VARCHAR,
    latitude            DOUBLE,
    longitude           DOUBLE,
    timezone            VARCHAR,
    ip                  VARCHAR,

    -- Client
    device              VARCHAR,                   -- mobile | tablet | desktop
    browser             VARCHAR,
    os                  VARCHAR,
    screen_resolution   VARCHAR,

    -- UTM (only set when non-empty)
    utm_source          VARCHAR,
    utm_medium          VARCHAR,
    utm_campaign        VARCHAR,
    utm_term            VARCHAR,
    utm_content         VARCHAR,

    entry_page          BOOLEAN NOT NULL DEFAULT false,
    is_returning        BOOLEAN NOT NULL DEFAULT false,
    exit_page           BOOLEAN NOT NULL DEFAULT false,  -- set by page_exit
    time_on_page        BIGINT                     -- ms, NULL until exit
);
-- Page exit lookup: newest open view for (session, page)
CREATE INDEX IF NOT EXISTS idx_page_views_session_page
    ON page_views(session_id, page, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_page_views_created_at
    ON page_views(created_at DESC);

-- ===========================================
-- USER SESSIONS (one row per client session id)
-- ===========================================
-- pages_visited is a JSON array with set semantics, kept in first-visit order.
-- converted only ever goes false -> true.
CREATE TABLE IF NOT EXISTS user_sessions (
    session_id          VARCHAR PRIMARY KEY,
    first_seen          TIMESTAMP NOT NULL,
    last_seen           TIMESTAMP NOT NULL,
    page_views          INTEGER NOT NULL DEFAULT 1,
    pages_visited       VARCHAR NOT NULL DEFAULT '[]',
    entry_page          VARCHAR NOT NULL,
    exit_page           VARCHAR,
    referrer            VARCHAR,
    referrer_category   VARCHAR NOT NULL,
    referrer_source     VARCHAR NOT NULL,
    device              VARCHAR,
    browser             VARCHAR,
    os                  VARCHAR,
    country             VARCHAR,
    city                VARCHAR,
    region              VARCHAR,
    utm_source          VARCHAR,
    utm_medium          VARCHAR,
    utm_campaign        VARCHAR,
    is_returning        BOOLEAN NOT NULL DEFAULT false,  -- insert-only
    session_duration    BIGINT,                    -- ms, set on page exit
    bounced             BOOLEAN NOT NULL DEFAULT false,
    converted           BOOLEAN NOT NULL DEFAULT false
);
CREATE INDEX IF NOT EXISTS idx_user_sessions_first_seen
    ON user_sessions(first_seen DESC);

-- ===========================================
-- CLICK EVENTS
-- ===========================================
CREATE TABLE IF NOT EXISTS click_events (
    id                  VARCHAR PRIMARY KEY,
    session_id          VARCHAR NOT NULL,
    element_id          VARCHAR NOT NULL,
    element_type        VARCHAR NOT NULL,
    element_text        VARCHAR,
    page                VARCHAR NOT NULL,
    x_position          INTEGER,
    y_position          INTEGER,
    created_at          TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_click_events_created_at
    ON click_events(created_at DESC);

-- ===========================================
-- SCROLL EVENTS (running maximum per session + page)
-- ===========================================
CREATE TABLE IF NOT EXISTS scroll_events (
    session_id          VARCHAR NOT NULL,
    page                VARCHAR NOT NULL,
    scroll_depth        INTEGER NOT NULL,          -- last reported depth
    max_scroll_depth    INTEGER NOT NULL,          -- never decreases
    created_at          TIMESTAMP NOT NULL,        -- last update
    PRIMARY KEY (session_id, page)
);

-- ===========================================
-- FORM INTERACTIONS
-- ===========================================
CREATE TABLE IF NOT EXISTS form_interactions (
    id                  VARCHAR PRIMARY KEY,
    session_id          VARCHAR NOT NULL,
    form_id             VARCHAR NOT NULL,
    field_name          VARCHAR NOT NULL,
    action              VARCHAR NOT NULL,          -- focus | blur | change | error
    time_spent          BIGINT,                    -- ms
    page                VARCHAR NOT NULL,
    created_at          TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_form_interactions_created_at
    ON form_interactions(created_at DESC);

-- ===========================================
-- FORM SUBMISSIONS
-- ===========================================
CREATE TABLE IF NOT EXISTS form_submissions (
    id                  VARCHAR PRIMARY KEY,
    session_id          VARCHAR NOT NULL,
    form_type           VARCHAR NOT NULL,
    page                VARCHAR NOT NULL,
    success             BOOLEAN NOT NULL,
    time_taken          BIGINT,                    -- ms
    field_errors        VARCHAR,                   -- JSON array of field names
    created_at          TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_form_submissions_created_at
    ON form_submissions(created_at DESC);

-- ===========================================
-- LEADS (public intake form)
-- ===========================================
CREATE TABLE IF NOT EXISTS leads (
    id                  VARCHAR PRIMARY KEY,       -- UUID v4
    full_name           VARCHAR NOT NULL,
    email               VARCHAR NOT NULL,
    phone               VARCHAR NOT NULL,
    business_name       VARCHAR NOT NULL,
    instagram_handle    VARCHAR NOT NULL,
    services            VARCHAR NOT NULL,          -- JSON array of strings
    business_type       VARCHAR NOT NULL,
    budget              VARCHAR NOT NULL,
    biggest_goal        VARCHAR NOT NULL,
    status              VARCHAR NOT NULL DEFAULT 'new',
    submitted_at        TIMESTAMP NOT NULL,
    updated_at          TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_leads_submitted_at
    ON leads(submitted_at DESC);

-- ===========================================
-- ADMINS
-- ===========================================
CREATE TABLE IF NOT EXISTS admins (
    email               VARCHAR PRIMARY KEY,
    password_hash       VARCHAR NOT NULL,          -- Argon2id PHC string
    role                VARCHAR NOT NULL DEFAULT 'admin',
    created_at          TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#
    )
}
