use async_trait::async_trait;
use cmdkit_core::{EventChannel, Registry, RegistryExt, ServiceRegistry};
use cmdkit_dispatch::config::CommandBusConfig;
use cmdkit_dispatch::{
    Command, CommandBus, CommandCompleted, CommandError, CommandHandler, CommandResult,
    InMemoryCommandBus, TimeoutPolicy,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

trait UserStore: Send + Sync {
    fn create(&self, name: &str) -> Result<u32, String>;
}

struct StaticUserStore;

impl UserStore for StaticUserStore {
    fn create(&self, name: &str) -> Result<u32, String> {
        if name.is_empty() {
            return Err("empty name".into());
        }
        Ok(42)
    }
}

struct CreateUser {
    name: String,
    events: EventChannel<CommandCompleted<Self>>,
    created: AtomicBool,
}

impl Command for CreateUser {
    const NAME: &'static str = "CreateUser";

    fn events(&self) -> &EventChannel<CommandCompleted<Self>> {
        &self.events
    }

    fn completed(&self) {
        self.created.store(true, Ordering::SeqCst);
    }

    fn failed(&self, err: &CommandError) {
        eprintln!("CreateUser failed: {err}");
    }
}

#[derive(Default)]
struct CreateUserHandler {
    store: Option<Arc<dyn UserStore>>,
}

#[async_trait]
impl CommandHandler for CreateUserHandler {
    type Command = CreateUser;

    fn bind(&mut self, registry: &dyn Registry) -> CommandResult<()> {
        self.store = Some(registry.resolve::<Arc<dyn UserStore>>()?);
        Ok(())
    }

    async fn handle(&self, cmd: &CreateUser) -> CommandResult<()> {
        let store = self
            .store
            .as_ref()
            .ok_or(CommandError::Infra("store not bound".into()))?;
        let id = store.create(&cmd.name).map_err(CommandError::Validation)?;
        println!("CreateUser: name={}, id={id}", cmd.name);
        Ok(())
    }
}

struct Reindex {
    events: EventChannel<CommandCompleted<Self>>,
}

impl Command for Reindex {
    const NAME: &'static str = "Reindex";

    fn events(&self) -> &EventChannel<CommandCompleted<Self>> {
        &self.events
    }

    fn timeout(&self) -> TimeoutPolicy {
        TimeoutPolicy::After(Duration::from_millis(100))
    }
}

struct ReindexHandler;

#[async_trait]
impl CommandHandler for ReindexHandler {
    type Command = Reindex;

    async fn handle(&self, _cmd: &Reindex) -> CommandResult<()> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = Arc::new(ServiceRegistry::new());
    registry.provide::<Arc<dyn UserStore>>(Arc::new(StaticUserStore));

    let bus = InMemoryCommandBus::builder()
        .registry(registry)
        .config(CommandBusConfig::with_default_timeout(Duration::from_secs(5)))
        .build();
    bus.register(CreateUserHandler::default())?;
    bus.register(ReindexHandler)?;

    let cmd = Arc::new(CreateUser {
        name: "Alice".into(),
        events: EventChannel::new(),
        created: AtomicBool::new(false),
    });
    cmd.events().listen(|ev: &CommandCompleted<CreateUser>| {
        println!("event: {} success={}", ev.command_name(), ev.is_success());
    });
    bus.dispatch(cmd.clone()).await?;
    println!("created={}", cmd.created.load(Ordering::SeqCst));

    // 超时的命令 -> 返回 Timeout 错误
    let reindex = Arc::new(Reindex {
        events: EventChannel::new(),
    });
    if let Err(err) = bus.wait(reindex).await {
        eprintln!("Reindex timed out as expected: {err}");
    }

    // 未注册的命令 -> 返回 NoHandler 错误
    struct DeleteUser {
        events: EventChannel<CommandCompleted<Self>>,
    }

    impl Command for DeleteUser {
        const NAME: &'static str = "DeleteUser";

        fn events(&self) -> &EventChannel<CommandCompleted<Self>> {
            &self.events
        }
    }

    let delete = Arc::new(DeleteUser {
        events: EventChannel::new(),
    });
    if let Err(CommandError::NoHandler { command }) = bus.wait(delete).await {
        eprintln!("NoHandler as expected for command: {command}");
    }

    println!("registered: {:?}", bus.registered_commands());
    Ok(())
}
