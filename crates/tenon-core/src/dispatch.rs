//! Recursive parse and dispatch of one token sequence.
//!
//! Each level runs the same steps on its own tokens:
//!
//! 1. Split flags from positionals. `--` turns flag scanning off for the rest
//!    of this level. A token like `-5` is positional unless `5` is a flag.
//! 2. Match positionals against the plan's arguments, greedy but skipping an
//!    optional argument when its token is needed by a later required part.
//!    Once the arguments are exhausted, the next token selects a sub-command
//!    and the remainder is dispatched there.
//! 3. Reject missing required parts and leftover tokens.
//! 4. Bind defaults, check the run-condition, run the action.
//!
//! Flags are resolved against the level that scans them, so a sub-command's
//! own flags must follow a `--` at the parent level when the parent has no
//! flag with that character. Bindings accumulate across levels: the innermost
//! action sees every value bound along the path.

use std::collections::HashSet;
use std::sync::Arc;

use crate::command::{Command, ExecutionPath};
use crate::converter::ConverterRegistry;
use crate::error::{Error, Result, UsageKind};
use crate::inject::InjectedValueAccess;
use crate::parameters::{CommandMetadata, CommandParameters};
use crate::part::{CommandArgument, Part, PartId};
use crate::plan::{CommandPlan, PlanCache};

/// Introduces a flag group.
const FLAG_PREFIX: char = '-';

/// Ends flag scanning for the current level.
const END_OF_FLAGS: &str = "--";

pub(crate) struct Dispatcher<'a> {
    converters: &'a ConverterRegistry,
    plans: &'a PlanCache,
    context: &'a dyn InjectedValueAccess,
}

impl<'a> Dispatcher<'a> {
    pub(crate) fn new(
        converters: &'a ConverterRegistry,
        plans: &'a PlanCache,
        context: &'a dyn InjectedValueAccess,
    ) -> Self {
        Self {
            converters,
            plans,
            context,
        }
    }

    /// Dispatch `args` to `root`, which was reached as `called_name`.
    pub(crate) fn dispatch(
        &self,
        called_name: &str,
        root: Arc<Command>,
        args: &[String],
    ) -> Result<i32> {
        let mut params = CommandParameters::new(
            self.converters,
            self.context,
            CommandMetadata::new(called_name, args.to_vec()),
        );
        let path = ExecutionPath::new(Arc::clone(&root));
        self.execute_level(root, path, &mut params, args)
    }

    fn execute_level(
        &self,
        command: Arc<Command>,
        path: ExecutionPath,
        params: &mut CommandParameters<'a>,
        args: &[String],
    ) -> Result<i32> {
        let plan = self.plans.get(&command)?;
        log::trace!("Dispatching {} token(s) to '{path}'", args.len());

        let mut needed: HashSet<PartId> = plan.defaulted().iter().map(|d| d.id()).collect();
        let positionals = self.split_flags(&plan, &path, params, &mut needed, args)?;

        let arguments = plan.arguments();
        let mut next_part = 0;
        let mut remaining_required = plan.required_parts();
        let mut index = 0;

        'scan: while index < positionals.len() {
            let token = &positionals[index];
            loop {
                let Some(part) = arguments.get(next_part) else {
                    if !plan.has_sub_commands() {
                        break 'scan;
                    }
                    let rest = &positionals[index + 1..];
                    return self.descend(&command, &plan, &path, params, &needed, token, rest);
                };
                next_part += 1;

                let remaining_tokens = positionals.len() - index;
                if remaining_tokens < remaining_required {
                    let missing = missing_part(&plan, next_part - 1, remaining_tokens);
                    return Err(Error::usage(UsageKind::NotEnoughArguments { missing }, path));
                }
                if !part.is_required() && remaining_tokens == remaining_required {
                    log::trace!("Skipping {} to reserve tokens", part.text_representation());
                    continue;
                }

                if self.accepts(part, token)? {
                    if part.is_variable() {
                        params.bind(part.id(), positionals[index..].to_vec());
                        index = positionals.len();
                    } else {
                        params.bind(part.id(), vec![token.clone()]);
                        index += 1;
                    }
                    needed.remove(&part.id());
                    if part.is_required() {
                        remaining_required -= 1;
                    }
                    break;
                } else if part.is_required() {
                    return Err(Error::usage(
                        UsageKind::MissingArgument {
                            part: part.text_representation(),
                        },
                        path,
                    ));
                }
            }
        }

        let unmatched_required = arguments[next_part..].iter().any(Part::is_required);
        if unmatched_required || plan.is_sub_command_required() {
            let missing = missing_part(&plan, next_part, 0);
            return Err(Error::usage(UsageKind::NotEnoughArguments { missing }, path));
        }
        if index < positionals.len() {
            let extra = positionals[index..].to_vec();
            return Err(Error::usage(UsageKind::TooManyArguments { extra }, path));
        }

        fill_defaults(&plan, params, &needed);
        if !command.is_satisfied(params) {
            return Err(Error::ConditionFailed { path });
        }

        log::debug!("Executing '{path}'");
        command
            .run(params)
            .map_err(|e| match e.downcast::<Error>() {
                Ok(err) => err,
                Err(other) => Error::Execution {
                    source: other.into(),
                    path,
                },
            })
    }

    #[allow(clippy::too_many_arguments)]
    fn descend(
        &self,
        command: &Command,
        plan: &CommandPlan,
        path: &ExecutionPath,
        params: &mut CommandParameters<'a>,
        needed: &HashSet<PartId>,
        selector: &str,
        rest: &[String],
    ) -> Result<i32> {
        let Some(sub) = plan.sub_command(selector) else {
            return Err(Error::usage(
                UsageKind::InvalidSubCommand {
                    token: selector.to_string(),
                    options: plan.sub_command_names().to_vec(),
                },
                path.clone(),
            ));
        };
        let sub = Arc::clone(sub);
        let sub_path = path.with(Arc::clone(&sub));

        fill_defaults(plan, params, needed);
        if !command.is_satisfied(params) {
            return Err(Error::ConditionFailed { path: sub_path });
        }

        log::debug!("Descending into '{sub_path}' via '{selector}'");
        params.set_metadata(CommandMetadata::new(selector, rest.to_vec()));
        self.execute_level(sub, sub_path, params, rest)
    }

    /// Bind every flag group in `args` and return the remaining positionals.
    fn split_flags(
        &self,
        plan: &CommandPlan,
        path: &ExecutionPath,
        params: &mut CommandParameters<'a>,
        needed: &mut HashSet<PartId>,
        args: &[String],
    ) -> Result<Vec<String>> {
        let mut positionals = Vec::with_capacity(args.len());
        let mut flags_enabled = true;
        let mut tokens = args.iter();

        while let Some(token) = tokens.next() {
            if flags_enabled {
                if token == END_OF_FLAGS {
                    flags_enabled = false;
                    continue;
                }
                if let Some(group) = token.strip_prefix(FLAG_PREFIX) {
                    // A bare `-` and negative numbers stay positional.
                    let is_flag_group = group
                        .chars()
                        .next()
                        .is_some_and(|first| !first.is_numeric() || plan.flag(first).is_some());
                    if is_flag_group {
                        consume_flags(plan, path, params, needed, group, &mut tokens)?;
                        continue;
                    }
                }
            }
            positionals.push(token.clone());
        }
        Ok(positionals)
    }

    /// Whether any declared type of `part` accepts `token`. Untyped parts
    /// accept everything.
    fn accepts(&self, part: &CommandArgument, token: &str) -> Result<bool> {
        if part.types().is_empty() {
            return Ok(true);
        }
        for key in part.types() {
            if self.converters.accepts(key, token, self.context)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn consume_flags(
    plan: &CommandPlan,
    path: &ExecutionPath,
    params: &mut CommandParameters<'_>,
    needed: &mut HashSet<PartId>,
    group: &str,
    tokens: &mut std::slice::Iter<'_, String>,
) -> Result<()> {
    let mut chars = group.chars().peekable();
    while let Some(c) = chars.next() {
        let flag = plan
            .flag(c)
            .ok_or_else(|| Error::usage(UsageKind::NoSuchFlag(c), path.clone()))?;

        if !flag.accepts_argument() {
            params.mark_present(flag.id());
            continue;
        }
        if chars.peek().is_some() {
            return Err(Error::usage(UsageKind::FlagNotLastInGroup(c), path.clone()));
        }
        match tokens.next() {
            Some(value) => {
                params.bind(flag.id(), vec![value.clone()]);
                needed.remove(&flag.id());
            }
            None => log::debug!("Flag -{c} at end of input has no value; leaving it unbound"),
        }
    }
    Ok(())
}

/// The required part left without a token when `supplied` tokens remain for
/// the required parts from argument `from` onward.
fn missing_part(plan: &CommandPlan, from: usize, supplied: usize) -> String {
    let mut required: Vec<String> = plan.arguments()[from..]
        .iter()
        .filter(|arg| arg.is_required())
        .map(Part::text_representation)
        .collect();
    if plan.is_sub_command_required() {
        required.extend(plan.sub_command_slot().map(str::to_string));
    }
    required
        .get(supplied)
        .or_else(|| required.first())
        .cloned()
        .unwrap_or_default()
}

fn fill_defaults(plan: &CommandPlan, params: &mut CommandParameters<'_>, needed: &HashSet<PartId>) {
    for part in plan.defaulted() {
        if needed.contains(&part.id()) {
            params.bind_default(part.id(), part.defaults().to_vec());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::inject::InjectedValueStore;
    use crate::key::Key;
    use crate::part::{CommandFlag, SubCommandPart};
    use proptest::prelude::*;
    use std::sync::Mutex;

    /// What an action saw, captured for assertions.
    #[derive(Debug, Default, Clone, PartialEq)]
    struct Seen {
        values: Vec<(String, Vec<String>)>,
        present: Vec<String>,
        called_name: String,
        arguments: Vec<String>,
    }

    type Capture = Arc<Mutex<Option<Seen>>>;

    /// Build a command whose action records the named parts.
    fn recording(
        name: &str,
        parts: Vec<crate::part::CommandPart>,
        capture: &Capture,
    ) -> Arc<Command> {
        let capture = Arc::clone(capture);
        let observed = parts.clone();
        Command::builder(name)
            .parts(parts)
            .action(move |params| {
                let mut seen = Seen {
                    called_name: params.metadata().called_name().to_string(),
                    arguments: params.metadata().arguments().to_vec(),
                    ..Seen::default()
                };
                for part in &observed {
                    let raw = params.raw_values(part);
                    if !raw.is_empty() {
                        seen.values.push((part.text_representation(), raw.to_vec()));
                    }
                    if params.is_present(part) {
                        seen.present.push(part.text_representation());
                    }
                }
                *capture.lock().unwrap() = Some(seen);
                Ok(0)
            })
            .build()
    }

    fn run(root: &Arc<Command>, args: &[&str]) -> Result<i32> {
        let converters = ConverterRegistry::with_defaults();
        let plans = PlanCache::new(16);
        let context = InjectedValueStore::new();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        Dispatcher::new(&converters, &plans, &context).dispatch(root.name(), Arc::clone(root), &args)
    }

    fn seen(capture: &Capture) -> Seen {
        capture.lock().unwrap().clone().unwrap()
    }

    fn usage_kind(result: Result<i32>) -> UsageKind {
        result.unwrap_err().usage_kind().cloned().unwrap()
    }

    fn int_arg(name: &str) -> CommandArgument {
        CommandArgument::builder(name, "").of_type(Key::<i32>::of()).build()
    }

    // ------------------------------------------------------------------------
    // Positional matching
    // ------------------------------------------------------------------------

    #[test]
    fn test_exact_required_binds_in_order() {
        let capture = Capture::default();
        let root = recording(
            "copy",
            vec![
                CommandArgument::builder("from", "").build().into(),
                CommandArgument::builder("to", "").build().into(),
            ],
            &capture,
        );
        assert_eq!(run(&root, &["a", "b"]).unwrap(), 0);
        let seen = seen(&capture);
        assert_eq!(
            seen.values,
            vec![
                ("<from>".to_string(), vec!["a".to_string()]),
                ("<to>".to_string(), vec!["b".to_string()]),
            ]
        );
        assert_eq!(seen.called_name, "copy");
        assert_eq!(seen.arguments, vec!["a", "b"]);
    }

    #[test]
    fn test_optional_skipped_to_reserve_required() {
        let capture = Capture::default();
        let root = recording(
            "cmd",
            vec![
                CommandArgument::builder("opt", "")
                    .defaults_to(["def"])
                    .build()
                    .into(),
                CommandArgument::builder("req", "").build().into(),
            ],
            &capture,
        );
        run(&root, &["only"]).unwrap();
        let seen = seen(&capture);
        assert_eq!(
            seen.values,
            vec![
                ("[opt]".to_string(), vec!["def".to_string()]),
                ("<req>".to_string(), vec!["only".to_string()]),
            ]
        );
        assert_eq!(seen.present, vec!["[opt]", "<req>"]);
    }

    #[test]
    fn test_optional_taken_when_tokens_allow() {
        let capture = Capture::default();
        let root = recording(
            "cmd",
            vec![
                CommandArgument::builder("opt", "")
                    .defaults_to(["def"])
                    .build()
                    .into(),
                CommandArgument::builder("req", "").build().into(),
            ],
            &capture,
        );
        run(&root, &["first", "second"]).unwrap();
        let seen = seen(&capture);
        assert_eq!(seen.values[0].1, vec!["first"]);
        assert_eq!(seen.values[1].1, vec!["second"]);
    }

    #[test]
    fn test_optional_skipped_on_type_mismatch() {
        let capture = Capture::default();
        let root = recording(
            "cmd",
            vec![
                CommandArgument::builder("count", "")
                    .of_type(Key::<i32>::of())
                    .defaults_to(["1"])
                    .build()
                    .into(),
                CommandArgument::builder("name", "").optional().build().into(),
            ],
            &capture,
        );
        run(&root, &["bob"]).unwrap();
        let seen = seen(&capture);
        assert_eq!(
            seen.values,
            vec![
                ("[count]".to_string(), vec!["1".to_string()]),
                ("[name]".to_string(), vec!["bob".to_string()]),
            ]
        );
    }

    #[test]
    fn test_required_type_mismatch_is_missing_argument() {
        let root = Command::builder("cmd").part(int_arg("x")).build();
        assert_eq!(
            usage_kind(run(&root, &["abc"])),
            UsageKind::MissingArgument {
                part: "<x>".to_string()
            }
        );
    }

    #[test]
    fn test_variable_consumes_rest() {
        let capture = Capture::default();
        let root = recording(
            "sum",
            vec![
                CommandArgument::builder("first", "").build().into(),
                CommandArgument::builder("rest", "")
                    .of_type(Key::<i64>::of())
                    .variable()
                    .build()
                    .into(),
            ],
            &capture,
        );
        run(&root, &["label", "1", "2", "3"]).unwrap();
        assert_eq!(seen(&capture).values[1].1, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_not_enough_arguments() {
        let root = Command::builder("cmd")
            .part(int_arg("a"))
            .part(int_arg("b"))
            .build();
        assert_eq!(
            usage_kind(run(&root, &["1"])),
            UsageKind::NotEnoughArguments {
                missing: "<b>".to_string()
            }
        );
        assert_eq!(
            usage_kind(run(&root, &[])),
            UsageKind::NotEnoughArguments {
                missing: "<a>".to_string()
            }
        );
    }

    #[test]
    fn test_not_enough_arguments_names_part_after_optional() {
        let root = Command::builder("cmd")
            .part(CommandArgument::builder("opt", "").optional().build())
            .part(int_arg("a"))
            .part(int_arg("b"))
            .build();
        assert_eq!(
            usage_kind(run(&root, &["1"])),
            UsageKind::NotEnoughArguments {
                missing: "<b>".to_string()
            }
        );
    }

    #[test]
    fn test_too_many_arguments() {
        let root = Command::builder("cmd").part(int_arg("a")).build();
        let err = run(&root, &["1", "2", "3"]).unwrap_err();
        assert_eq!(
            err.usage_kind(),
            Some(&UsageKind::TooManyArguments {
                extra: vec!["2".to_string(), "3".to_string()]
            })
        );
        assert!(err.to_string().contains("Too many arguments: 2 3"));
    }

    #[test]
    fn test_negative_number_is_positional() {
        let capture = Capture::default();
        let root = recording("neg", vec![int_arg("n").into()], &capture);
        run(&root, &["-5"]).unwrap();
        assert_eq!(seen(&capture).values[0].1, vec!["-5"]);
    }

    #[test]
    fn test_bare_dash_is_positional() {
        let capture = Capture::default();
        let root = recording(
            "cat",
            vec![CommandArgument::builder("file", "").build().into()],
            &capture,
        );
        run(&root, &["-"]).unwrap();
        assert_eq!(seen(&capture).values[0].1, vec!["-"]);
    }

    #[test]
    fn test_missing_converter_fails_dispatch() {
        let root = Command::builder("cmd")
            .part(
                CommandArgument::builder("x", "")
                    .of_type(Key::<u128>::of())
                    .build(),
            )
            .build();
        let err = run(&root, &["1"]).unwrap_err();
        assert!(matches!(err, Error::MissingConverter { .. }));
    }

    // ------------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------------

    #[test]
    fn test_end_of_flags_marker() {
        let capture = Capture::default();
        let root = recording(
            "cmd",
            vec![
                CommandFlag::builder('v', "verbose").build().into(),
                CommandArgument::builder("text", "").build().into(),
            ],
            &capture,
        );
        run(&root, &["-v", "--", "-v"]).unwrap();
        let seen = seen(&capture);
        assert_eq!(seen.present, vec!["-v", "<text>"]);
        assert_eq!(seen.values, vec![("<text>".to_string(), vec!["-v".to_string()])]);
    }

    #[test]
    fn test_combined_switches() {
        let capture = Capture::default();
        let root = recording(
            "cmd",
            vec![
                CommandFlag::builder('a', "").build().into(),
                CommandFlag::builder('b', "").build().into(),
                CommandFlag::builder('c', "").build().into(),
            ],
            &capture,
        );
        run(&root, &["-ac"]).unwrap();
        assert_eq!(seen(&capture).present, vec!["-a", "-c"]);
    }

    #[test]
    fn test_argument_flag_consumes_next_token() {
        let capture = Capture::default();
        let root = recording(
            "cmd",
            vec![
                CommandFlag::builder('q', "").build().into(),
                CommandFlag::builder('n', "")
                    .argument("count")
                    .defaults_to(["1"])
                    .build()
                    .into(),
            ],
            &capture,
        );
        run(&root, &["-qn", "7"]).unwrap();
        let seen = seen(&capture);
        assert_eq!(seen.values, vec![("-n <count>".to_string(), vec!["7".to_string()])]);
        assert_eq!(seen.present, vec!["-q", "-n <count>"]);
    }

    #[test]
    fn test_argument_flag_not_last_in_group() {
        let root = Command::builder("cmd")
            .part(CommandFlag::builder('n', "").argument("count").build())
            .part(CommandFlag::builder('q', "").build())
            .build();
        assert_eq!(
            usage_kind(run(&root, &["-nq", "7"])),
            UsageKind::FlagNotLastInGroup('n')
        );
    }

    #[test]
    fn test_argument_flag_at_end_of_input_uses_default() {
        let capture = Capture::default();
        let root = recording(
            "cmd",
            vec![
                CommandFlag::builder('n', "")
                    .argument("count")
                    .defaults_to(["1"])
                    .build()
                    .into(),
            ],
            &capture,
        );
        run(&root, &["-n"]).unwrap();
        let seen = seen(&capture);
        assert_eq!(seen.values, vec![("-n <count>".to_string(), vec!["1".to_string()])]);
        assert_eq!(seen.present, vec!["-n <count>"]);
    }

    #[test]
    fn test_defaulted_part_is_present() {
        let opt = CommandArgument::builder("opt", "").defaults_to(["def"]).build();
        let read = opt.clone();
        let root = Command::builder("cmd")
            .part(opt)
            .action(move |params| Ok(i32::from(params.is_present(&read))))
            .build();
        assert_eq!(run(&root, &[]).unwrap(), 1);
    }

    #[test]
    fn test_unknown_flag() {
        let root = Command::builder("cmd")
            .part(CommandFlag::builder('v', "").build())
            .build();
        assert_eq!(usage_kind(run(&root, &["-vx"])), UsageKind::NoSuchFlag('x'));
    }

    #[test]
    fn test_digit_flag_wins_over_negative_number() {
        let capture = Capture::default();
        let root = recording(
            "cmd",
            vec![CommandFlag::builder('1', "one").build().into()],
            &capture,
        );
        run(&root, &["-1"]).unwrap();
        assert_eq!(seen(&capture).present, vec!["-1"]);
    }

    // ------------------------------------------------------------------------
    // Sub-commands
    // ------------------------------------------------------------------------

    fn tree(capture: &Capture) -> Arc<Command> {
        let a = recording("a", vec![int_arg("x").into()], capture);
        let b = Command::builder("b").alias("bee").build();
        Command::builder("root")
            .part(SubCommandPart::builder("sub", "").commands([a, b]).build())
            .build()
    }

    #[test]
    fn test_sub_command_dispatch() {
        let capture = Capture::default();
        let root = tree(&capture);
        run(&root, &["a", "5"]).unwrap();
        let seen = seen(&capture);
        assert_eq!(seen.values, vec![("<x>".to_string(), vec!["5".to_string()])]);
        assert_eq!(seen.called_name, "a");
        assert_eq!(seen.arguments, vec!["5"]);
    }

    #[test]
    fn test_sub_command_not_enough_arguments() {
        let root = tree(&Capture::default());
        let err = run(&root, &["a"]).unwrap_err();
        assert_eq!(
            err.usage_kind(),
            Some(&UsageKind::NotEnoughArguments {
                missing: "<x>".to_string()
            })
        );
        assert_eq!(err.execution_path().unwrap().names(), vec!["root", "a"]);
    }

    #[test]
    fn test_invalid_sub_command_lists_options() {
        let root = tree(&Capture::default());
        let err = run(&root, &["c"]).unwrap_err();
        assert_eq!(
            err.usage_kind(),
            Some(&UsageKind::InvalidSubCommand {
                token: "c".to_string(),
                options: vec!["a".to_string(), "b".to_string()],
            })
        );
        assert!(err.to_string().contains("Options: a, b"));
    }

    #[test]
    fn test_invalid_sub_command_omits_shadowed_command() {
        let go = Command::builder("go").action(|_| Ok(1)).build();
        let run_cmd = Command::builder("run").alias("go").action(|_| Ok(2)).build();
        let root = Command::builder("root")
            .part(SubCommandPart::builder("sub", "").commands([go, run_cmd]).build())
            .build();
        assert_eq!(run(&root, &["go"]).unwrap(), 2);
        assert_eq!(
            usage_kind(run(&root, &["stop"])),
            UsageKind::InvalidSubCommand {
                token: "stop".to_string(),
                options: vec!["run".to_string()],
            }
        );
    }

    #[test]
    fn test_sub_command_by_alias() {
        let root = tree(&Capture::default());
        assert_eq!(run(&root, &["bee"]).unwrap(), 0);
    }

    #[test]
    fn test_required_sub_command_missing() {
        let root = tree(&Capture::default());
        assert_eq!(
            usage_kind(run(&root, &[])),
            UsageKind::NotEnoughArguments {
                missing: "<a|b>".to_string()
            }
        );

        let with_argument = Command::builder("root")
            .part(CommandArgument::builder("level", "").build())
            .part(
                SubCommandPart::builder("sub", "")
                    .command(Command::builder("child").build())
                    .build(),
            )
            .build();
        assert_eq!(
            usage_kind(run(&with_argument, &["high"])),
            UsageKind::NotEnoughArguments {
                missing: "<child>".to_string()
            }
        );
    }

    #[test]
    fn test_optional_sub_command_missing_runs_parent() {
        let root = Command::builder("root")
            .part(
                SubCommandPart::builder("sub", "")
                    .command(Command::builder("child").build())
                    .optional()
                    .build(),
            )
            .action(|_| Ok(7))
            .build();
        assert_eq!(run(&root, &[]).unwrap(), 7);
    }

    #[test]
    fn test_parent_bindings_reach_child_action() {
        let capture = Capture::default();
        let level = CommandArgument::builder("level", "").build();
        let child_capture = Arc::clone(&capture);
        let observed = level.clone();
        let child = Command::builder("child")
            .action(move |params| {
                *child_capture.lock().unwrap() = Some(Seen {
                    values: vec![("<level>".into(), params.raw_values(&observed).to_vec())],
                    ..Seen::default()
                });
                Ok(0)
            })
            .build();
        let root = Command::builder("root")
            .part(level)
            .part(SubCommandPart::builder("sub", "").command(child).build())
            .build();
        run(&root, &["high", "child"]).unwrap();
        assert_eq!(seen(&capture).values[0].1, vec!["high"]);
    }

    #[test]
    fn test_sub_command_flags_after_end_of_flags() {
        let capture = Capture::default();
        let child = recording(
            "child",
            vec![CommandFlag::builder('f', "").build().into()],
            &capture,
        );
        let root = Command::builder("root")
            .part(SubCommandPart::builder("sub", "").command(child).build())
            .build();
        run(&root, &["--", "child", "-f"]).unwrap();
        assert_eq!(seen(&capture).present, vec!["-f"]);

        // Without `--` the parent scans `-f` and has no such flag.
        assert_eq!(
            usage_kind(run(&root, &["child", "-f"])),
            UsageKind::NoSuchFlag('f')
        );
    }

    // ------------------------------------------------------------------------
    // Conditions and actions
    // ------------------------------------------------------------------------

    #[test]
    fn test_condition_failed() {
        let root = Command::builder("locked").condition(|_| false).build();
        let err = run(&root, &[]).unwrap_err();
        assert!(matches!(err, Error::ConditionFailed { .. }));
    }

    #[test]
    fn test_parent_condition_checked_before_descent() {
        let root = Command::builder("root")
            .condition(|_| false)
            .part(
                SubCommandPart::builder("sub", "")
                    .command(Command::builder("child").action(|_| Ok(1)).build())
                    .build(),
            )
            .build();
        match run(&root, &["child"]).unwrap_err() {
            Error::ConditionFailed { path } => assert_eq!(path.names(), vec!["root", "child"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_action_status_returned() {
        let root = Command::builder("exit").action(|_| Ok(42)).build();
        assert_eq!(run(&root, &[]).unwrap(), 42);
    }

    #[test]
    fn test_foreign_action_error_is_wrapped() {
        let root = Command::builder("fail")
            .action(|_| Err(anyhow::anyhow!("disk full")))
            .build();
        match run(&root, &[]).unwrap_err() {
            Error::Execution { source, path } => {
                assert_eq!(source.to_string(), "disk full");
                assert_eq!(path.names(), vec!["fail"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_domain_action_error_is_not_rewrapped() {
        let root = Command::builder("fail")
            .action(|_| Err(Error::operation("inner").into()))
            .build();
        assert!(matches!(run(&root, &[]).unwrap_err(), Error::Operation(_)));
    }

    #[test]
    fn test_conversion_error_from_action_propagates() {
        let n = CommandArgument::builder("n", "").build();
        let read = n.clone();
        let root = Command::builder("cmd")
            .part(n)
            .action(move |params| Ok(params.value(&read).as_single(&Key::<i32>::of())?))
            .build();
        assert!(matches!(
            run(&root, &["nope"]).unwrap_err(),
            Error::Conversion { .. }
        ));
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    proptest! {
        #[test]
        fn prop_exact_required_binds_in_order(
            tokens in proptest::collection::vec("[a-z0-9]{1,8}", 1..8),
        ) {
            let capture = Capture::default();
            let parts = (0..tokens.len())
                .map(|i| CommandArgument::builder(format!("a{i}"), "").build().into())
                .collect();
            let root = recording("generated", parts, &capture);
            let args: Vec<&str> = tokens.iter().map(String::as_str).collect();
            prop_assert_eq!(run(&root, &args).unwrap(), 0);

            let expected: Vec<(String, Vec<String>)> = tokens
                .iter()
                .enumerate()
                .map(|(i, token)| (format!("<a{i}>"), vec![token.clone()]))
                .collect();
            prop_assert_eq!(seen(&capture).values, expected);
        }
    }
}
