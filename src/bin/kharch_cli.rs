use std::{env, path::PathBuf, process};

use kharch::{
    config::ConfigManager,
    core::ExpenseDraft,
    domain::PaymentStatus,
    errors::CliError,
    init,
    session::Session,
};

const HOME_ENV: &str = "KHARCH_HOME";

fn main() {
    init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        if matches!(err, CliError::Usage(_)) {
            print_usage();
        }
        process::exit(1);
    }
}

struct Options {
    command: String,
    operands: Vec<String>,
    data_dir: Option<PathBuf>,
    category: Option<String>,
    equal: bool,
    color: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, CliError> {
    let mut command = None;
    let mut operands = Vec::new();
    let mut data_dir = None;
    let mut category = None;
    let mut equal = false;
    let mut color = true;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| CliError::Usage("--data-dir needs a path".into()))?;
                data_dir = Some(PathBuf::from(dir));
            }
            "--category" => {
                category = Some(
                    args.next()
                        .ok_or_else(|| CliError::Usage("--category needs a name".into()))?,
                );
            }
            "--equal" => equal = true,
            "--no-color" => color = false,
            flag if flag.starts_with("--") => {
                return Err(CliError::Usage(format!("unknown option `{flag}`")));
            }
            _ if command.is_none() => command = Some(arg),
            _ => operands.push(arg),
        }
    }
    Ok(Options {
        command: command.ok_or_else(|| CliError::Usage("missing command".into()))?,
        operands,
        data_dir,
        category,
        equal,
        color,
    })
}

fn run() -> Result<(), CliError> {
    let options = parse_args(env::args().skip(1))?;

    let manager = match env::var_os(HOME_ENV) {
        Some(home) => ConfigManager::with_base_dir(PathBuf::from(home))?,
        None => ConfigManager::for_user()?,
    };
    let config = manager.load()?;
    if !options.color || !config.ui_color_enabled {
        colored::control::set_override(false);
    }

    let session = Session::open(config, options.data_dir.clone())?;
    let args: Vec<&str> = options.operands.iter().map(String::as_str).collect();
    match options.command.as_str() {
        "report" => println!("{}", session.render_report()?),
        "settle" => println!("{}", session.render_settlement()?),
        "stats" => println!("{}", session.render_stats()?),
        "json" => println!("{}", session.report_json()?),
        "history" => {
            let [term] = optional_operands::<1>("history", &args)?;
            println!("{}", session.render_history(term.unwrap_or(""))?);
        }
        "add" => cmd_add(&session, &options, &args)?,
        "pay" => cmd_pay(&session, &args)?,
        "delete" => {
            let [id] = required_operands::<1>("delete <id>", &args)?;
            let removed = session.delete_expense(id)?;
            println!("Deleted {}", removed.description);
        }
        "people" => cmd_people(&session, &args)?,
        "seed" => {
            if session.store().seed_demo_data()? {
                println!("Seeded demo data in {}", session.store().root().display());
            } else {
                println!("Store already has data; nothing seeded.");
            }
        }
        "backup" => {
            let [note] = optional_operands::<1>("backup", &args)?;
            let info = session.store().backup(note)?;
            println!("Created backup {}", info.name);
        }
        "backups" => {
            let backups = session.store().list_backups()?;
            if backups.is_empty() {
                println!("No backups yet.");
            }
            for backup in backups {
                println!("{}", backup.name);
            }
        }
        "restore" => {
            let [name] = required_operands::<1>("restore <name>", &args)?;
            let snapshot = session.store().restore_backup(name)?;
            println!(
                "Restored {name}: {} participants, {} expenses",
                snapshot.roster.len(),
                snapshot.expenses.len()
            );
        }
        other => return Err(CliError::Usage(format!("unknown command `{other}`"))),
    }

    Ok(())
}

fn cmd_add(session: &Session, options: &Options, args: &[&str]) -> Result<(), CliError> {
    let (description, total, payer, members) = match args {
        [description, total, payer, members @ ..] if !members.is_empty() => {
            (*description, parse_amount(total)?, *payer, members)
        }
        _ => {
            return Err(CliError::Usage(
                "add <description> <amount> <payer> <member[=share]>...".into(),
            ))
        }
    };
    let mut draft = ExpenseDraft::new(description, total, payer);
    if let Some(category) = &options.category {
        draft = draft.category(category.as_str());
    }
    let draft = if options.equal {
        draft.split_equally(members.iter().copied())?
    } else {
        members.iter().try_fold(draft, |draft, member| {
            let (name, share) = member.split_once('=').ok_or_else(|| {
                CliError::Usage(format!("member `{member}` needs a share, e.g. `{member}=100`"))
            })?;
            Ok::<_, CliError>(draft.member(name, parse_amount(share)?))
        })?
    };
    let expense = session.record_expense(draft)?;
    println!("Added {} as {}", expense.description, expense.id);
    Ok(())
}

fn cmd_pay(session: &Session, args: &[&str]) -> Result<(), CliError> {
    let (id, status, amount, paid_by) = match args {
        [id, status, rest @ ..] if rest.len() <= 2 => {
            let amount = rest.first().map(|value| parse_amount(value)).transpose()?;
            (*id, parse_status(status)?, amount, rest.get(1).copied().unwrap_or(""))
        }
        _ => {
            return Err(CliError::Usage(
                "pay <id> <pending|partial|paid> [amount] [by]".into(),
            ))
        }
    };
    let expense = session.set_payment_status(id, status, amount, paid_by)?;
    println!(
        "{} is now {} ({:.2} of {:.2} paid)",
        expense.description, expense.payment_status, expense.paid_amount, expense.total_amount
    );
    Ok(())
}

fn cmd_people(session: &Session, args: &[&str]) -> Result<(), CliError> {
    match args {
        [] => println!("{}", session.render_roster()?),
        ["add", id, name] => {
            let participant = session.add_participant(id, name)?;
            println!("Saved {} ({})", participant.name, participant.id);
        }
        ["remove", id] => {
            session.remove_participant(id)?;
            println!("Removed {id}");
        }
        _ => {
            return Err(CliError::Usage(
                "people [add <id> <name> | remove <id>]".into(),
            ))
        }
    }
    Ok(())
}

fn required_operands<'a, const N: usize>(
    usage: &str,
    args: &[&'a str],
) -> Result<[&'a str; N], CliError> {
    <[&str; N]>::try_from(args).map_err(|_| CliError::Usage(format!("usage: {usage}")))
}

fn optional_operands<'a, const N: usize>(
    command: &str,
    args: &[&'a str],
) -> Result<[Option<&'a str>; N], CliError> {
    if args.len() > N {
        return Err(CliError::Usage(format!(
            "unexpected argument `{}` for {command}",
            args[N]
        )));
    }
    let mut slots = [None; N];
    for (slot, arg) in slots.iter_mut().zip(args) {
        *slot = Some(*arg);
    }
    Ok(slots)
}

fn parse_amount(value: &str) -> Result<f64, CliError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| CliError::Usage(format!("invalid amount `{value}`")))
}

fn parse_status(value: &str) -> Result<PaymentStatus, CliError> {
    match value.to_lowercase().as_str() {
        "pending" => Ok(PaymentStatus::Pending),
        "partial" => Ok(PaymentStatus::Partial),
        "paid" => Ok(PaymentStatus::Paid),
        other => Err(CliError::Usage(format!("unknown payment status `{other}`"))),
    }
}

fn print_usage() {
    eprintln!(
        "Usage: kharch_cli <command> [--data-dir <dir>] [--no-color]\n\
         Commands:\n  \
         report                                balances, settlement plan and warnings\n  \
         settle                                settlement plan only\n  \
         stats                                 spend by category and payer\n  \
         json                                  full report as JSON\n  \
         history [term]                        expenses newest first, optionally filtered\n  \
         add <desc> <amount> <payer> <member[=share]>... [--equal] [--category <name>]\n  \
         \x20                                     record an expense\n  \
         pay <id> <pending|partial|paid> [amount] [by]\n  \
         \x20                                     update payment status\n  \
         delete <id>                           remove an expense\n  \
         people [add <id> <name> | remove <id>]\n  \
         \x20                                     list or edit participants\n  \
         seed                                  populate an empty store with demo data\n  \
         backup [note]                         snapshot the store\n  \
         backups                               list snapshots, newest first\n  \
         restore <name>                        replace the store with a snapshot"
    );
}
