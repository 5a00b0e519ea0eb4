/// Liveness probe, mounted at `/health` and `/healthz`.
pub async fn health_check() -> &'static str {
    "ok"
}
