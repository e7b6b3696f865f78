//! USERS command - List users and change their state.

use anyhow::Result;
use biobank_core::paged_list::ALL_STATUSES;
use biobank_core::{
    DisplayState, DomainResult, LabelService, ListQuery, Outcome, PagedList, RecordSource,
    RestClient, User, UserState, VersionedRecord, confirm_then,
};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;

use super::{
    AnnotationView, ConsoleNotifier, HumanReadable, annotation_context, format_timestamp, output, output_outcome,
    print_annotations,
};

/// Arguments for the users command.
#[derive(Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Subcommand)]
pub enum UsersCommand {
    /// List users, one page at a time
    List(ListUsersArgs),

    /// Show one user
    Show {
        /// User ID
        id: String,
    },

    /// Activate a registered user
    Activate(TransitionArgs),

    /// Lock a registered or active user
    Lock(TransitionArgs),

    /// Unlock a locked user
    Unlock(TransitionArgs),
}

#[derive(Args)]
pub struct ListUsersArgs {
    /// Only users whose name or email contains this text
    #[arg(short, long, default_value = "")]
    pub filter: String,

    /// Only users in this state (all, registered, active, locked)
    #[arg(short, long, default_value = "all")]
    pub status: String,

    /// Sort field, prefix with '-' for descending
    #[arg(long, default_value = "name")]
    pub sort: String,

    /// Page number
    #[arg(short, long, default_value_t = 1)]
    pub page: u32,

    /// Users per page
    #[arg(long, default_value_t = 10)]
    pub page_size: u32,
}

#[derive(Args)]
pub struct TransitionArgs {
    /// User ID
    pub id: String,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Option<String>,
    pub version: u64,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub state: UserState,
    pub time_added: DateTime<Utc>,
    pub time_modified: Option<DateTime<Utc>>,
    pub annotations: Vec<AnnotationView>,
}

impl UserView {
    fn new(user: &VersionedRecord<User>) -> Result<Self> {
        Ok(Self {
            id: user.id.clone(),
            version: user.version,
            name: user.entity.name.clone(),
            email: user.entity.email.clone(),
            avatar_url: user.entity.avatar_url.clone(),
            state: user.entity.state,
            time_added: user.time_added,
            time_modified: user.time_modified,
            annotations: AnnotationView::all(user)?,
        })
    }
}

impl HumanReadable for UserView {
    fn print_human(&self) {
        println!("{}", "User Details".green().bold());
        println!("{}", "=".repeat(60));
        println!();
        println!("  {} {}", "ID:".cyan(), self.id.as_deref().unwrap_or("-"));
        println!("  {} {}", "Name:".cyan(), self.name);
        println!("  {} {}", "Email:".cyan(), self.email);
        println!("  {} {}", "State:".cyan(), state_colored(self.state));
        println!("  {} {}", "Version:".cyan(), self.version);
        println!("  {} {}", "Added:".cyan(), format_timestamp(&self.time_added));
        if let Some(modified) = &self.time_modified {
            println!("  {} {}", "Modified:".cyan(), format_timestamp(modified));
        }
        print_annotations(&self.annotations);
    }
}

fn state_colored(state: UserState) -> colored::ColoredString {
    match state {
        UserState::Registered => state.to_string().yellow(),
        UserState::Active => state.to_string().green(),
        UserState::Locked => state.to_string().red(),
    }
}

#[derive(Debug, Serialize)]
pub struct UserListView {
    pub query: ListQuery,
    pub total: u64,
    pub max_pages: u32,
    pub users: Vec<UserView>,
    #[serde(skip)]
    pub empty_message: Option<&'static str>,
}

impl HumanReadable for UserListView {
    fn print_human(&self) {
        if let Some(message) = self.empty_message {
            println!("{}", message.yellow());
            return;
        }

        println!(
            "{} (page {} of {}, {} total)",
            "Users".green().bold(),
            self.query.page,
            self.max_pages,
            self.total
        );
        println!("{}", "-".repeat(60));
        for user in &self.users {
            println!(
                "  {:<24} {:<30} {}",
                user.name,
                user.email,
                state_colored(user.state)
            );
        }
    }
}

/// Execute the users command.
pub async fn execute<R: RestClient>(rest: &R, human: bool, args: UsersArgs) -> Result<()> {
    match args.command {
        UsersCommand::List(args) => list(rest, human, args).await,
        UsersCommand::Show { id } => {
            let user = VersionedRecord::<User>::get(rest, &id, &annotation_context()).await?;
            output(&UserView::new(&user)?, human)
        }
        UsersCommand::Activate(args) => transition(rest, human, args, Transition::Activate).await,
        UsersCommand::Lock(args) => transition(rest, human, args, Transition::Lock).await,
        UsersCommand::Unlock(args) => transition(rest, human, args, Transition::Unlock).await,
    }
}

async fn list<R: RestClient>(rest: &R, human: bool, args: ListUsersArgs) -> Result<()> {
    if args.status != ALL_STATUSES {
        LabelService::<UserState>::new().parse(&args.status)?;
    }

    let query = ListQuery {
        filter: args.filter,
        status: args.status,
        sort: args.sort,
        page: args.page.max(1),
        page_size: args.page_size,
    };
    let source = RecordSource::<_, User>::new(rest, "users/search", annotation_context());
    let mut list = PagedList::new(source, query);

    let empty_message = match list.reload().await? {
        DisplayState::NoEntities => Some("No users have been registered."),
        DisplayState::NoResults => Some("No users match the criteria."),
        DisplayState::HaveResults => None,
    };
    let (total, max_pages) = list.result().map_or((0, 0), |r| (r.total, r.max_pages));
    let view = UserListView {
        query: list.query().clone(),
        total,
        max_pages,
        users: list.items().iter().map(UserView::new).collect::<Result<Vec<_>>>()?,
        empty_message,
    };
    output(&view, human)
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Activate,
    Lock,
    Unlock,
}

impl Transition {
    fn title(self) -> &'static str {
        match self {
            Self::Activate => "Activate user",
            Self::Lock => "Lock user",
            Self::Unlock => "Unlock user",
        }
    }

    fn done(self) -> &'static str {
        match self {
            Self::Activate => "User activated",
            Self::Lock => "User locked",
            Self::Unlock => "User unlocked",
        }
    }

    fn check(self, user: &User) -> DomainResult<()> {
        match self {
            Self::Activate => user.check_activate(),
            Self::Lock => user.check_lock(),
            Self::Unlock => user.check_unlock(),
        }
    }

    async fn apply<R: RestClient>(
        self,
        user: &VersionedRecord<User>,
        rest: &R,
    ) -> biobank_core::Result<VersionedRecord<User>> {
        match self {
            Self::Activate => user.activate(rest).await,
            Self::Lock => user.lock(rest).await,
            Self::Unlock => user.unlock(rest).await,
        }
    }
}

async fn transition<R: RestClient>(
    rest: &R,
    human: bool,
    args: TransitionArgs,
    transition: Transition,
) -> Result<()> {
    let user = VersionedRecord::<User>::get(rest, &args.id, &annotation_context()).await?;
    // No prompt for a transition the current state forbids.
    transition.check(&user.entity)?;

    let notifier = ConsoleNotifier::new(args.yes);
    let message = format!(
        "{} <{}> is {}. Continue?",
        user.entity.name, user.entity.email, user.entity.state
    );
    let outcome = confirm_then(&notifier, transition.title(), &message, transition.done(), || {
        transition.apply(&user, rest)
    })
    .await?;

    let outcome = match outcome {
        Outcome::Confirmed(updated) => Outcome::Confirmed(UserView::new(&updated)?),
        Outcome::Cancelled => Outcome::Cancelled,
    };
    output_outcome(outcome, human)
}
