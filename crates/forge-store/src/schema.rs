//! The four tables named in the data model, plus their indices. Split into
//! individual statements because sqlite's `execute` (unlike some drivers)
//! will not run a semicolon-delimited batch as one call.

pub const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS module_builds (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        name                TEXT NOT NULL,
        stream              TEXT NOT NULL,
        version             INTEGER NOT NULL,
        context             TEXT NOT NULL,
        state               TEXT NOT NULL,
        state_reason        TEXT,
        manifest_json       TEXT NOT NULL,
        scmurl              TEXT NOT NULL,
        owner               TEXT NOT NULL,
        koji_tag            TEXT,
        batch               INTEGER NOT NULL DEFAULT 0,
        rebuild_strategy    TEXT NOT NULL,
        new_repo_task_id    INTEGER,
        ref_build_context   TEXT NOT NULL,
        build_context       TEXT NOT NULL,
        runtime_context     TEXT NOT NULL,
        submitted           TEXT NOT NULL,
        modified            TEXT NOT NULL,
        completed           TEXT,
        UNIQUE(name, stream, version, context)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS component_builds (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        module_id           INTEGER NOT NULL REFERENCES module_builds(id) ON DELETE CASCADE,
        package             TEXT NOT NULL,
        scmurl              TEXT NOT NULL,
        format              TEXT NOT NULL,
        task_id             INTEGER,
        state               TEXT,
        state_reason        TEXT,
        nvr                 TEXT,
        batch               INTEGER NOT NULL,
        tagged              INTEGER NOT NULL DEFAULT 0,
        tagged_in_final     INTEGER NOT NULL DEFAULT 0,
        build_time_only     INTEGER NOT NULL DEFAULT 0,
        reused_component_id INTEGER REFERENCES component_builds(id),
        weight              REAL NOT NULL DEFAULT 1.0,
        UNIQUE(module_id, package)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS module_builds_trace (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        module_id    INTEGER NOT NULL REFERENCES module_builds(id) ON DELETE CASCADE,
        state_time   TEXT NOT NULL,
        state        TEXT NOT NULL,
        state_reason TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS component_builds_trace (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        component_id INTEGER NOT NULL REFERENCES component_builds(id) ON DELETE CASCADE,
        state_time   TEXT NOT NULL,
        state        TEXT,
        state_reason TEXT,
        task_id      INTEGER
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_component_builds_module_batch ON component_builds(module_id, batch)",
    "CREATE INDEX IF NOT EXISTS idx_module_builds_name_stream ON module_builds(name, stream)",
    "CREATE INDEX IF NOT EXISTS idx_module_builds_trace_module ON module_builds_trace(module_id, state_time)",
    "CREATE INDEX IF NOT EXISTS idx_component_builds_trace_component ON component_builds_trace(component_id, state_time)",
];
