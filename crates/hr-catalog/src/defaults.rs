//! Built-in intents registered by `IntentCatalog::with_defaults`.
//!
//! Keywords are kept distinctive per intent: a single shared keyword adds the
//! same score to every intent that lists it, which only blurs the ranking.

use crate::error::CatalogResult;
use crate::intent::{Intent, IntentCategory};

/// A file system path: `/abs/path`, `./rel`, `dir/sub`, or `name.ext`.
const PATH: &str = r"(?:~|\.{1,2})?/[\w./-]+|[\w.-]+/[\w./-]*|[\w-]+\.\w+";

/// Build the default intent set, in registration order.
pub fn default_intents() -> CatalogResult<Vec<Intent>> {
    let mut intents = social()?;
    intents.extend(code()?);
    intents.extend(file()?);
    intents.extend(question()?);
    intents.extend(productivity()?);
    intents.extend(home()?);
    intents.extend(control()?);
    Ok(intents)
}

fn social() -> CatalogResult<Vec<Intent>> {
    Ok(vec![
        Intent::new(
            IntentCategory::Social,
            "greeting",
            "User greeting or starting a conversation",
        )
        .keywords(&[
            "hello",
            "hi",
            "hey",
            "howdy",
            "greetings",
            "good morning",
            "good afternoon",
            "good evening",
        ])
        .patterns(&[
            r"^\s*(?:hey|hi|hello|howdy|greetings)\b",
            r"^\s*good\s+(?:morning|afternoon|evening|day)\b",
        ])?
        .examples(&["Hello!", "Hi there", "Hey, how are you?", "Good morning!"]),
        Intent::new(IntentCategory::Social, "farewell", "User ending the conversation")
            .keywords(&["bye", "goodbye", "see you", "goodnight", "cya", "farewell"])
            .patterns(&[r"\b(?:bye|goodbye|see\s+you|goodnight|cya|farewell)\b"])?
            .examples(&["Bye!", "Goodbye", "See you later", "I'm heading out"]),
        Intent::new(IntentCategory::Social, "gratitude", "User expressing thanks")
            .keywords(&["thanks", "thank you", "thx", "appreciate", "grateful"])
            .patterns(&[r"\b(?:thanks|thank\s+you|thx|appreciate\s+it|grateful)\b"])?
            .examples(&["Thanks!", "Thank you so much", "I appreciate it"]),
    ])
}

fn code() -> CatalogResult<Vec<Intent>> {
    Ok(vec![
        Intent::new(IntentCategory::Code, "code_generate", "Generate or write new code")
            .keywords(&["write", "generate", "implement", "function", "class", "component"])
            .patterns(&[
                r"\b(?:write|create|generate|implement|build)\b.*\b(?:function|class|component|module|api|endpoint|script)\b",
                r"\b(?:add|create)\b.*\b(?:feature|functionality)\b",
            ])?
            .examples(&[
                "Write a function to validate emails",
                "Create a React component for the header",
                "Implement a binary search algorithm",
            ]),
        Intent::new(IntentCategory::Code, "code_debug", "Debug or fix code issues")
            .keywords(&["debug", "fix", "bug", "error", "broken", "crash"])
            .patterns(&[
                r"\b(?:debug|fix|solve|resolve)\b.*\b(?:error|bug|issue|problem|exception)\b",
                r"\b(?:not working|broken|failing|crashed|crashes)\b",
            ])?
            .examples(&[
                "Debug the authentication error",
                "Fix this TypeError",
                "The login isn't working",
            ]),
        Intent::new(IntentCategory::Code, "code_review", "Review or analyze code")
            .keywords(&["review", "analyze", "evaluate", "assess"])
            .patterns(&[
                r"\b(?:review|analy[sz]e|evaluate|assess)\b.*\b(?:code|function|class|pull request|pr|implementation)\b",
                r"\bwhat do you think (?:of|about)\b",
            ])?
            .examples(&[
                "Review this pull request",
                "Check my code for issues",
                "What do you think of this implementation?",
            ]),
        Intent::new(IntentCategory::Code, "code_refactor", "Refactor or improve existing code")
            .keywords(&["refactor", "clean up", "optimize", "restructure", "simplify"])
            .patterns(&[
                r"\b(?:refactor|clean\s*up|optimi[sz]e|restructure|simplify)\b",
                r"\bmake (?:it|this|the code) (?:better|cleaner|faster|more efficient)\b",
            ])?
            .examples(&[
                "Refactor this function to be more readable",
                "Clean up this component",
                "Make this code more efficient",
            ]),
        Intent::new(IntentCategory::Code, "run_command", "Execute a shell command")
            .keywords(&["run", "execute", "shell", "terminal", "command"])
            .patterns(&[
                r"^\s*(?:run|execute|exec)\s+(?P<command>.+)$",
                r"^\s*(?P<command>(?:npm|yarn|pip|cargo|git|docker|make)\b.*)$",
            ])?
            .examples(&["Run the tests", "Execute npm install", "git status"]),
    ])
}

fn file() -> CatalogResult<Vec<Intent>> {
    Ok(vec![
        Intent::new(IntentCategory::File, "file_create", "Create a new file or directory")
            .keywords(&["create", "touch", "mkdir", "new file", "new folder"])
            .patterns(&[
                &format!(r"\b(?:create|make|touch|mkdir)\b.*?(?P<path>{PATH})"),
                r"\b(?:create|make)\b.*\b(?:file|folder|directory)\b",
            ])?
            .examples(&[
                "Create a new file called test.py",
                "Make a folder for the project",
                "mkdir src/components",
            ]),
        Intent::new(IntentCategory::File, "file_read", "Read or view file contents")
            .keywords(&["read", "view", "cat", "display", "open", "contents"])
            .patterns(&[
                &format!(r"\b(?:read|show|view|cat|display|open)\b.*?(?P<path>{PATH})"),
                &format!(r"\bwhat(?:'s| is) in (?P<path>{PATH})"),
            ])?
            .examples(&[
                "Show me the contents of config.yaml",
                "Read the README.md file",
                "What's in package.json?",
            ]),
        Intent::new(IntentCategory::File, "file_delete", "Delete files or directories")
            .keywords(&["delete", "remove", "rm", "erase", "trash"])
            .patterns(&[
                &format!(r"\b(?:delete|remove|rm|erase|trash)\b.*?(?P<path>{PATH})"),
                r"\b(?:delete|remove|erase|trash)\b.*\b(?:files?|folders?|director(?:y|ies))\b",
            ])?
            .examples(&[
                "Delete the old log files",
                "Remove the temp/ directory",
                "rm build/output.log",
            ]),
    ])
}

fn question() -> CatalogResult<Vec<Intent>> {
    Ok(vec![
        Intent::new(IntentCategory::Question, "explanation_request", "Request an explanation")
            .keywords(&["explain", "describe", "what is", "what are", "how does", "tell me about"])
            .patterns(&[
                r"^\s*(?:explain|describe)\b",
                r"^\s*what\s+(?:is|are)\s+(?:a|an|the)\b",
                r"^\s*how\s+does\b",
                r"^\s*tell\s+me\s+(?:about|more)\b",
            ])?
            .examples(&[
                "Explain how async/await works",
                "What is a closure?",
                "Tell me about microservices",
            ]),
        Intent::new(IntentCategory::Question, "factual_question", "Ask a factual question")
            .keywords(&["what", "who", "when", "where", "which", "how many", "how much"])
            .patterns(&[
                r"^\s*(?:what|who|when|where|which)\b.*\?\s*$",
                r"^\s*how\s+(?:many|much)\b",
            ])?
            .examples(&[
                "Who wrote this library?",
                "When was Python created?",
                "How many moons does Jupiter have?",
            ]),
        Intent::new(IntentCategory::Question, "web_search", "Search the web for information")
            .keywords(&["search", "look up", "google", "research", "find"])
            .patterns(&[
                r"^\s*(?:search|find|look\s*up|google)\b",
                r"\b(?:search|look\s*up|google)\b.*\b(?:for|about|on)\b",
            ])?
            .examples(&[
                "Search for the latest Python release",
                "Look up the Express.js documentation",
            ]),
    ])
}

fn productivity() -> CatalogResult<Vec<Intent>> {
    Ok(vec![
        Intent::new(IntentCategory::Productivity, "create_reminder", "Create a reminder")
            .keywords(&["remind", "reminder", "remember", "don't forget"])
            .patterns(&[
                r"remind me to (?P<task>.+) at (?P<time>.+)",
                r"\bremind\s+(?:me|us)\b",
                r"\bset\s+an?\s+reminder\b",
                r"\bdon't\s+(?:let\s+me\s+)?forget\b",
            ])?
            .examples(&[
                "Remind me to call John at 3pm",
                "Set a reminder for the meeting tomorrow",
                "Don't let me forget to submit the report",
            ]),
        Intent::new(IntentCategory::Productivity, "calendar_query", "Query calendar events")
            .keywords(&["calendar", "schedule", "meeting", "appointment", "busy"])
            .patterns(&[
                r"\bwhat(?:'s| is)\s+(?:on\s+)?(?:my\s+)?(?:calendar|schedule)\b",
                r"\b(?:am\s+i|are\s+we)\s+(?:free|busy|available)\b",
                r"\b(?:any|what)\s+(?:meetings|appointments|events)\b",
            ])?
            .examples(&[
                "What's on my calendar today?",
                "Am I free at 2pm?",
                "What meetings do I have tomorrow?",
            ]),
    ])
}

fn home() -> CatalogResult<Vec<Intent>> {
    Ok(vec![
        Intent::new(IntentCategory::Home, "lights_control", "Control lights")
            .keywords(&["lights", "light", "lamp", "brightness", "dim"])
            .patterns(&[
                r"\b(?:turn|switch)\s+(?P<state>on|off)\s+(?:the\s+)?(?:(?P<room>[\w ]+?)\s+)?lights?\b",
                r"\b(?:dim|brighten)\s+(?:the\s+)?(?:(?P<room>[\w ]+?)\s+)?lights?\b",
                r"\blights?\s+(?P<state>on|off)\b",
            ])?
            .optional_slots(&["room", "state"])
            .examples(&["Turn on the lights", "Dim the living room lights", "Lights off"]),
        Intent::new(IntentCategory::Home, "thermostat_control", "Control thermostat and temperature")
            .keywords(&["temperature", "thermostat", "heating", "ac", "degrees"])
            .patterns(&[
                r"\bset\s+(?:the\s+)?(?:temperature|thermostat)\s+to\s+(?P<temperature>\d{1,3})",
                r"\b(?:turn|switch)\s+(?:on|off|up|down)\s+(?:the\s+)?(?:heat|heating|ac|air\s*conditioning)\b",
                r"\bmake\s+it\s+(?:warmer|cooler|hotter|colder)\b",
            ])?
            .optional_slots(&["temperature"])
            .examples(&["Set the temperature to 72", "Turn up the heat", "Make it cooler in here"]),
    ])
}

fn control() -> CatalogResult<Vec<Intent>> {
    Ok(vec![
        Intent::new(IntentCategory::Control, "help_request", "Request help or documentation")
            .keywords(&["help", "how do i", "tutorial", "guide", "documentation"])
            .patterns(&[
                r"^\s*help\b",
                r"\bhow\s+(?:do|can|should)\s+i\b",
                r"\b(?:show|give)\s+me\s+(?:the\s+)?(?:help|docs|documentation)\b",
            ])?
            .examples(&["Help", "How do I use this feature?", "Show me the documentation"]),
        Intent::new(IntentCategory::Control, "settings_change", "Change settings or preferences")
            .keywords(&["settings", "configure", "preferences", "enable", "disable"])
            .patterns(&[
                r"\b(?:change|update|set|modify)\s+(?:the\s+|my\s+)?(?:settings?|config|preferences?)\b",
                r"\b(?:enable|disable)\b",
            ])?
            .examples(&[
                "Change the theme to dark mode",
                "Enable voice commands",
                "Update my notification preferences",
            ]),
        Intent::new(IntentCategory::Control, "cancel_action", "Cancel the current action")
            .keywords(&["cancel", "stop", "abort", "nevermind", "never mind", "forget it"])
            .patterns(&[r"^\s*(?:cancel|stop|abort|nevermind|never\s*mind|forget\s*it)\b"])?
            .examples(&["Cancel", "Stop that", "Nevermind"]),
        Intent::new(IntentCategory::Control, "undo_action", "Undo the last action")
            .keywords(&["undo", "revert", "rollback", "go back"])
            .patterns(&[
                r"^\s*undo\b",
                r"\b(?:revert|roll\s*back)\s+(?:the\s+)?(?:last|previous)\b",
                r"^\s*go\s+back\b",
            ])?
            .examples(&["Undo", "Revert the last change", "Go back"]),
    ])
}
