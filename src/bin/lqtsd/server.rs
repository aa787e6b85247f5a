use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use lqts::config::Configuration;
use lqts::core::api::{
    ClearCompletedQuery, ErrorResponse, JobGroupQuery, QdelRequest, QdelResponse,
    QpriorityRequest, QpriorityResponse, QstatQuery, QsubRequest, QsubResponse, QsummaryResponse,
    ReallyQuery, WorkersRequest, WorkersResponse,
};
use lqts::core::job::{JobId, JobIdSelector};
use lqts::core::pool::DynamicProcessPool;
use lqts::core::queue::JobQueue;
use lqts::core::resources::CpuResourceManager;
use lqts::core::snapshot;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct ServerState {
    queue: Arc<Mutex<JobQueue>>,
    cpu: Arc<Mutex<CpuResourceManager>>,
    pool: Arc<DynamicProcessPool>,
    config: Arc<Configuration>,
}

pub async fn run(config: Configuration) -> anyhow::Result<()> {
    let config = Arc::new(config);

    let queue = if config.resume_on_start_up && config.queue_file.exists() {
        match snapshot::load(&config.queue_file, config.completed_limit) {
            Ok(queue) => {
                tracing::info!("resumed queue from {}", config.queue_file.display());
                queue
            }
            Err(e) => {
                tracing::warn!("failed to load queue snapshot, starting empty: {e}");
                JobQueue::new(config.completed_limit)
            }
        }
    } else {
        JobQueue::new(config.completed_limit)
    };

    let queue = Arc::new(Mutex::new(queue));
    let cpu = Arc::new(Mutex::new(CpuResourceManager::new(config.nworkers)));
    let pool = Arc::new(DynamicProcessPool::new(Arc::clone(&queue), Arc::clone(&cpu)));

    let manager_handle = pool.spawn_manager();
    tracing::info!("manager thread started with {} workers", config.nworkers);

    let state = ServerState {
        queue,
        cpu,
        pool: Arc::clone(&pool),
        config: Arc::clone(&config),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/qsub", post(qsub))
        .route("/qstat", get(qstat))
        .route("/qsummary", get(qsummary))
        .route("/workers", get(get_workers).post(set_workers))
        .route("/jobgroup", get(jobgroup))
        .route("/qclear", post(qclear))
        .route("/clear_completed", post(clear_completed))
        .route("/qdel", post(qdel))
        .route("/qpriority", post(qpriority))
        .route("/resume", post(resume))
        .with_state(state.clone());

    let bind_addr = format!("{}:{}", config.ip_address, config.port);
    let addr: std::net::SocketAddr = tokio::net::lookup_host(&bind_addr)
        .await?
        .next()
        .ok_or_else(|| anyhow::anyhow!("failed to resolve address: {bind_addr}"))?;

    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    let std_listener: std::net::TcpListener = socket.into();
    std_listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(std_listener)?;

    tracing::info!("listening on {addr} (SO_REUSEPORT enabled)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down: saving queue snapshot to {}", config.queue_file.display());
    pool.shutdown(true);
    let _ = manager_handle.join();
    if let Err(e) = snapshot::save(&state.queue.lock().unwrap_or_else(|e| e.into_inner()), &config.queue_file) {
        tracing::error!("failed to write queue snapshot: {e}");
    }

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, initiating graceful shutdown"),
        _ = sigint.recv() => tracing::info!("received SIGINT, initiating graceful shutdown"),
    }
}

fn resolve_selectors(queue: &JobQueue, id_strs: &[String]) -> anyhow::Result<HashSet<JobId>> {
    let mut ids = HashSet::new();
    for id_str in id_strs {
        let selector: JobIdSelector = id_str
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid job id '{id_str}': {e}"))?;
        match selector.index {
            Some(index) => {
                ids.insert(JobId::new(selector.group, index));
            }
            None => {
                for job in queue.queued_jobs().chain(queue.running_jobs()) {
                    if job.job_id.group == selector.group {
                        ids.insert(job.job_id);
                    }
                }
            }
        }
    }
    Ok(ids)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn qsub(State(state): State<ServerState>, Json(req): Json<QsubRequest>) -> impl IntoResponse {
    let job_ids = state.queue.lock().unwrap_or_else(|e| e.into_inner()).submit(req.jobs);
    Json(QsubResponse { job_ids }).into_response()
}

async fn qstat(State(state): State<ServerState>, Query(query): Query<QstatQuery>) -> impl IntoResponse {
    let queue = state.queue.lock().unwrap_or_else(|e| e.into_inner());
    let all = !query.running && !query.queued && !query.completed;

    let mut jobs = Vec::new();
    if query.running || all {
        jobs.extend(queue.running_jobs().cloned());
    }
    if query.queued || all {
        jobs.extend(queue.queued_jobs().cloned());
    }
    if query.completed || all {
        jobs.extend(queue.completed_jobs().cloned());
    }
    Json(jobs)
}

async fn qsummary(State(state): State<ServerState>) -> impl IntoResponse {
    let queue = state.queue.lock().unwrap_or_else(|e| e.into_inner());
    Json(QsummaryResponse {
        running: queue.running_count(),
        queued: queue.queued_count(),
    })
}

async fn get_workers(State(state): State<ServerState>) -> impl IntoResponse {
    let cpu = state.cpu.lock().unwrap_or_else(|e| e.into_inner());
    Json(WorkersResponse {
        nworkers: cpu.total_count(),
    })
}

async fn set_workers(
    State(state): State<ServerState>,
    Json(req): Json<WorkersRequest>,
) -> impl IntoResponse {
    let mut cpu = state.cpu.lock().unwrap_or_else(|e| e.into_inner());
    cpu.resize(req.nworkers);
    Json(WorkersResponse {
        nworkers: cpu.total_count(),
    })
}

async fn jobgroup(
    State(state): State<ServerState>,
    Query(query): Query<JobGroupQuery>,
) -> impl IntoResponse {
    let queue = state.queue.lock().unwrap_or_else(|e| e.into_inner());
    match queue.get_job_group(query.group_number) {
        Ok(jobs) => Json(jobs.into_iter().cloned().collect::<Vec<_>>()).into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse { error: e.to_string() }),
        )
            .into_response(),
    }
}

async fn qclear(
    State(state): State<ServerState>,
    Query(query): Query<ReallyQuery>,
) -> impl IntoResponse {
    if !query.really {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "pass ?really=true to confirm clearing the entire queue".to_string(),
            }),
        )
            .into_response();
    }
    state.pool.kill_jobs(&[], true);
    state.queue.lock().unwrap_or_else(|e| e.into_inner()).clear();
    StatusCode::OK.into_response()
}

async fn clear_completed(
    State(state): State<ServerState>,
    Query(query): Query<ClearCompletedQuery>,
) -> impl IntoResponse {
    if !query.really {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "pass ?really=true to confirm clearing completed jobs".to_string(),
            }),
        )
            .into_response();
    }
    let n = state
        .queue
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clear_completed(query.group);
    Json(serde_json::json!({ "cleared": n })).into_response()
}

async fn qdel(State(state): State<ServerState>, Json(req): Json<QdelRequest>) -> impl IntoResponse {
    let ids = {
        let queue = state.queue.lock().unwrap_or_else(|e| e.into_inner());
        match resolve_selectors(&queue, &req.ids) {
            Ok(ids) => ids,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse { error: e.to_string() }),
                )
                    .into_response()
            }
        }
    };

    let mut deleted = Vec::new();
    for id in &ids {
        let removed = state
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .qdel(id.group, Some(id.index));
        deleted.extend(removed);
    }
    let id_list: Vec<JobId> = ids.into_iter().collect();
    let killed = state.pool.kill_jobs(&id_list, false);
    deleted.extend(killed);

    Json(QdelResponse { deleted_jobs: deleted }).into_response()
}

async fn qpriority(
    State(state): State<ServerState>,
    Json(req): Json<QpriorityRequest>,
) -> impl IntoResponse {
    let mut queue = state.queue.lock().unwrap_or_else(|e| e.into_inner());
    let ids = match resolve_selectors(&queue, &req.ids) {
        Ok(ids) => ids,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { error: e.to_string() }),
            )
                .into_response()
        }
    };
    let updated = queue.qpriority(&ids, req.priority);
    Json(QpriorityResponse { updated }).into_response()
}

async fn resume(State(state): State<ServerState>) -> impl IntoResponse {
    state.pool.unpause();
    StatusCode::OK
}
