//! Prompt templates
//!
//! All generation prompts live here so the wire contracts (marker tags, the
//! citation header, the JSON structure shape) stay in one place.

use reportify_core::Source;

/// Literal header splitting an answer from its reference list
pub const CITATION_HEADER: &str = "参考来源:";

/// Marker tags for the question generator's output
pub const THINK_START: &str = "<|think_start|>";
pub const THINK_END: &str = "<|think_end|>";
pub const QUESTION_START: &str = "<|question_start|>";
pub const QUESTION_END: &str = "<|question_end|>";

/// Prompt for generating the report structure (ordered section titles)
pub fn structure_prompt(topic: &str) -> String {
    format!(
        r#"你是一名资深行业分析师，需要为主题「{topic}」撰写一份研究报告。

请为这份报告设计章节结构，要求：
1. 章节数量在 3 到 6 个之间，按阅读顺序排列
2. 每个章节聚焦主题的一个方面，标题简洁明确
3. 只返回 JSON，不要附加任何解释文字

返回格式：
{{"structure": [{{"subtitle": "章节标题"}}, {{"subtitle": "章节标题"}}]}}

示例：
主题：新能源汽车产业动态
{{"structure": [{{"subtitle": "行业概述"}}, {{"subtitle": "政策环境"}}, {{"subtitle": "技术进展"}}, {{"subtitle": "市场趋势"}}]}}
"#
    )
}

/// Prompt for generating retrieval sub-questions for one section
pub fn question_prompt(topic: &str, section: &str) -> String {
    format!(
        r#"你是一名情报检索专家。报告主题为「{topic}」，当前章节为「{section}」。
请先思考这一章节需要哪些方面的信息，再给出 3 到 5 个具体的检索问题。

输出格式要求：
- 思考过程放在 {THINK_START} 和 {THINK_END} 之间
- 每个检索问题单独放在一对 {QUESTION_START} 和 {QUESTION_END} 之间
- 标记之外的内容会被忽略

示例：
主题：量子计算技术动态，章节：政策和战略
{THINK_START}政策章节需要覆盖主要国家的政策文件、资金投入和战略规划。{THINK_END}
{QUESTION_START}量子计算 各国政策 最新文件{QUESTION_END}
{QUESTION_START}量子计算 国家战略 资金投入{QUESTION_END}
{QUESTION_START}量子计算 政策和战略 产业影响{QUESTION_END}
"#
    )
}

/// Seed prompt: the first document becomes the initial draft
pub fn initial_refine_prompt(topic: &str, section: &str, document: &str) -> String {
    format!(
        r#"你正在撰写关于「{topic}」的报告，当前章节为「{section}」。
请根据以下检索资料撰写该章节的初稿。要求内容准确、结构清晰，在行文中标明信息来源的 URL。

检索资料：
{document}
"#
    )
}

/// Fold prompt: integrate one more document into the running draft
pub fn refine_prompt(topic: &str, section: &str, existing_draft: &str, document: &str) -> String {
    format!(
        r#"你正在撰写关于「{topic}」的报告，当前章节为「{section}」。
下面是该章节的现有草稿，以及一份新的检索资料。
请将新资料中有价值的信息融入草稿，输出修订后的完整草稿（不是增量），保留已有内容中仍然正确的部分，并在行文中标明信息来源的 URL。

现有草稿：
{existing_draft}

新的检索资料：
{document}
"#
    )
}

/// Decide whether a chat query needs a web search (answer 是/否)
pub fn need_search_prompt(query: &str) -> String {
    format!(
        r#"用户问题: {query}

请判断这个问题是否需要进行网络搜索来获取最新或特定信息。
如果问题涉及最新事件、具体数据、特定事实或需要最新信息，应该进行搜索。
如果是一般性问题、主观问题或不需要特定信息的问题，则不需要搜索。

只回答"是"或"否"。
"#
    )
}

/// Decide whether full article text is needed (answer 是/否)
pub fn need_full_text_prompt(query: &str, search_results: &str) -> String {
    format!(
        r#"用户问题: {query}

搜索结果摘要:
{search_results}

基于以上搜索结果摘要，请判断是否需要获取完整文章内容来更全面地回答用户问题。
如果摘要已经包含足够信息，或问题只需要简单信息，则不需要获取全文。
如果问题需要深入分析、详细解释或摘要信息不足，则需要获取全文。

只回答"是"或"否"。
"#
    )
}

/// Synthesize the chat answer from all gathered material
pub fn final_answer_prompt(
    query: &str,
    search_results: &str,
    knowledge_base_results: &str,
    full_text: &str,
) -> String {
    format!(
        r#"用户问题: {query}

搜索结果:
{search_results}

知识库检索结果:
{knowledge_base_results}

全文内容(如果有):
{full_text}

请根据以上信息，生成一个全面、准确的回答。回答应该:
1. 直接回应用户问题，不要添加任何解释性文字
2. 综合搜索结果和知识库信息
3. 在回答中适当位置添加引用标记，如[1]、[2]等，表明信息来源
4. 保持客观、准确，避免臆测
5. 确保所有引用的来源在参考来源中都有对应条目
"#
    )
}

/// Reconcile inline markers with a numbered reference list
pub fn citation_prompt(answer: &str, sources: &str) -> String {
    format!(
        r#"回答内容: {answer}

信息来源:
{sources}

请为上述回答生成适当的引用索引，并确保回答中已经包含了对应的引用标记。

要求：
1. 检查回答中是否已经包含了引用标记（如[1]、[2]等）
2. 如果回答中缺少引用标记，请在适当位置添加，确保每个关键信息点都有引用
3. 生成完整的参考来源列表，格式如下：
   [1] 来源标题, URL或文档名称
   [2] 来源标题, URL或文档名称
4. 确保回答中的引用标记与参考来源列表一一对应
5. 如果多处引用同一篇文章，使用相同的引用标号
6. 所有引用必须来源于提供的知识库或网络搜索结果，不得编造引用

请返回修改后的完整回答（包含引用标记），然后另起一行以"{CITATION_HEADER}"开头给出参考来源列表。
"#
    )
}

/// Number and format deduplicated sources for the citation prompt,
/// truncating content previews to 100 characters.
pub fn format_sources(sources: &[Source]) -> String {
    let mut formatted = String::new();
    for (i, source) in sources.iter().enumerate() {
        formatted.push_str(&format!("来源 {}:\n", i + 1));
        formatted.push_str(&format!("标题: {}\n", source.title));
        formatted.push_str(&format!("URL: {}\n", source.url));
        if let Some(content) = &source.content {
            if !content.is_empty() {
                let preview: String = content.chars().take(100).collect();
                if content.chars().count() > 100 {
                    formatted.push_str(&format!("内容片段: {}...\n", preview));
                } else {
                    formatted.push_str(&format!("内容片段: {}\n", preview));
                }
            }
        }
        formatted.push('\n');
    }
    formatted
}
