/// Prompt sent to the text-generation model. `{name}` is replaced with the contact name.
pub const POEM_PROMPT_TEMPLATE: &str = "Write a short german poem including the name '{name}'. \
The poem should be 4 lines long and include nature.";

pub fn build_poem_prompt(name: &str) -> String {
    POEM_PROMPT_TEMPLATE.replace("{name}", name)
}
