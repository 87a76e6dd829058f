//! Default instructions sent to the prompt service.
//!
//! Each placeholder names a remote object the stage declares as input.

/// Per-ticket sentiment and emotion.
pub const SENTIMENT: &str = "\
Analyze the sentiment of each support ticket description in this CSV data: {support_tickets}

For each ticket, determine:
- Sentiment (Positive/Neutral/Negative/Very Negative)
- Emotion indicators (frustrated, angry, confused, satisfied, etc.)
- Urgency level based on language used
- Key trigger words found (cancel, refund, manager, urgent, etc.)

Return as JSON array with ticket_id, sentiment, emotion, urgency, trigger_words for each ticket.";

/// Category validation and suggestions.
pub const CATEGORIZATION: &str = "\
Analyze the categorization accuracy of support tickets: {support_tickets}

For each ticket:
1. Validate if current category matches the description content
2. Suggest better category if miscategorized
3. Identify emerging issue patterns not covered by existing categories
4. Flag tickets that might need multiple categories

Return as JSON with ticket_id, current_category, suggested_category, confidence_score, reasoning.";

/// Escalation risk scored from tickets and sentiment.
pub const ESCALATION: &str = "\
Calculate escalation risk for each ticket using this data: {support_tickets} and sentiment analysis: {sentiment_analysis}

Risk factors:
- High/Critical priority + Negative sentiment = HIGH RISK
- VIP/Premium customers + any negative sentiment = HIGH RISK
- Resolution time > 48 hours = MEDIUM RISK
- Trigger words (cancel, refund, manager) = MEDIUM RISK
- Multiple tickets from same customer = MEDIUM RISK
- Low satisfaction scores (<3) = MEDIUM RISK

Return JSON with ticket_id, risk_level (LOW/MEDIUM/HIGH/CRITICAL), risk_factors, recommended_action, priority_score (1-10).";

/// Reply templates per category, sentiment and tier.
pub const TEMPLATES: &str = "\
Create personalized response templates based on: {support_tickets}, {sentiment_analysis}, and {category_analysis}

Generate templates for each combination of:
- Category (Technical, Billing, Product, etc.)
- Sentiment (Positive, Neutral, Negative, Very Negative)
- Customer Tier (Standard, Premium, VIP)

Each template should:
- Use appropriate tone for sentiment level
- Include customer tier-specific language
- Have placeholders for [CUSTOMER_NAME], [SPECIFIC_ISSUE], [AGENT_NAME]
- Provide clear next steps
- Include escalation language when needed

Return as JSON with category, sentiment, tier, template_text, tone_notes.";

/// Executive summary of the batch.
pub const SUMMARY: &str = "\
Create executive summary and key metrics from: {support_tickets}, {sentiment_analysis}, {escalation_risk}

Calculate and provide:
1. Total tickets, open/closed counts, resolution rate
2. Average resolution time overall and by priority
3. Customer satisfaction by tier (VIP/Premium/Standard)
4. Sentiment distribution (% positive/neutral/negative)
5. High-risk tickets requiring immediate attention
6. Agent workload distribution
7. Top 5 categories by volume
8. Emerging issue patterns
9. Daily/weekly trend insights
10. Escalation alerts and recommended actions

Format as JSON with clear metrics and actionable insights. Include the fields \
total_tickets, avg_resolution_time, avg_satisfaction, high_risk_count, daily_trends, \
category_trends and emerging_issues.";

/// Fused per-ticket view of every analysis.
pub const TICKET_ANALYSIS: &str = "\
Combine all analysis for individual ticket display: {support_tickets}, {sentiment_analysis}, {escalation_risk}, {category_analysis}

For each ticket, provide:
- All original ticket data
- Sentiment score and emotion
- Risk level and factors
- Category validation
- Recommended actions
- Priority color coding (red=critical/high, yellow=medium, green=low)

Return as JSON array suitable for table display with color coding indicators.";
